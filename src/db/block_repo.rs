use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::{Block, BlockKind, GeoPoint, NewBlock, RemoteSource};

use super::{parse_timestamp, parse_timestamp_opt};

/// Rows per INSERT statement on the bulk path, to bound statement size.
const INSERT_CHUNK: usize = 10;

const BLOCK_SELECT: &str = "SELECT b.*, \
     (SELECT COUNT(*) FROM connections c WHERE c.block_id = b.id) AS num_connections \
     FROM blocks b";

pub struct BlockRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    id: i64,
    title: Option<String>,
    description: Option<String>,
    content: String,
    kind: String,
    content_type: Option<String>,
    source: Option<String>,
    created_by: String,
    remote_source_type: Option<String>,
    remote_source_id: Option<String>,
    remote_class: Option<String>,
    captured_at: Option<String>,
    capture_latitude: Option<f64>,
    capture_longitude: Option<f64>,
    created_at: String,
    updated_at: String,
    num_connections: i64,
}

impl BlockRow {
    fn into_block(self) -> Result<Block, sqlx::Error> {
        let kind: BlockKind = self
            .kind
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        let remote = match (self.remote_source_type, self.remote_source_id) {
            (Some(provider), Some(id)) => Some(RemoteSource {
                provider,
                id,
                class: self.remote_class,
            }),
            _ => None,
        };

        let capture_location = match (self.capture_latitude, self.capture_longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(Block {
            id: self.id,
            title: self.title,
            description: self.description,
            content: self.content,
            kind,
            content_type: self.content_type,
            source: self.source,
            created_by: self.created_by,
            remote,
            captured_at: parse_timestamp_opt(self.captured_at.as_deref()),
            capture_location,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
            num_connections: self.num_connections,
        })
    }
}

impl BlockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts one block and its initial connections in a single transaction.
    ///
    /// Returns the new block's identifier.
    pub async fn create(&self, block: &NewBlock, created_by: &str) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO blocks (title, description, content, kind, content_type, source, created_by,
                                remote_source_type, remote_source_id, remote_class,
                                captured_at, capture_latitude, capture_longitude, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&block.title)
        .bind(&block.description)
        .bind(&block.content)
        .bind(block.kind.to_string())
        .bind(&block.content_type)
        .bind(&block.source)
        .bind(created_by)
        .bind(block.remote.as_ref().map(|r| r.provider.as_str()))
        .bind(block.remote.as_ref().map(|r| r.id.as_str()))
        .bind(block.remote.as_ref().and_then(|r| r.class.as_deref()))
        .bind(block.captured_at.map(|t| t.to_rfc3339()))
        .bind(block.capture_location.map(|p| p.latitude))
        .bind(block.capture_location.map(|p| p.longitude))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let block_id = result.last_insert_rowid();

        for collection_id in &block.collections_to_connect {
            sqlx::query(
                "INSERT OR IGNORE INTO connections \
                 (block_id, collection_id, created_by, created_at, remote_created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(block_id)
            .bind(collection_id)
            .bind(created_by)
            .bind(&now)
            .bind(block.remote_connected_at.map(|t| t.to_rfc3339()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(block_id)
    }

    /// Inserts many blocks in chunked multi-row statements, all inside one
    /// transaction, optionally connecting every new block to `connect_to`.
    ///
    /// Returns the new identifiers in input order.
    pub async fn create_many(
        &self,
        blocks: &[NewBlock],
        connect_to: Option<i64>,
        created_by: &str,
    ) -> Result<Vec<i64>, sqlx::Error> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(blocks.len());

        for chunk in blocks.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO blocks (title, description, content, kind, content_type, source, \
                 created_by, remote_source_type, remote_source_id, remote_class, \
                 captured_at, capture_latitude, capture_longitude, created_at, updated_at) ",
            );
            qb.push_values(chunk, |mut row, block| {
                row.push_bind(&block.title)
                    .push_bind(&block.description)
                    .push_bind(&block.content)
                    .push_bind(block.kind.to_string())
                    .push_bind(&block.content_type)
                    .push_bind(&block.source)
                    .push_bind(created_by)
                    .push_bind(block.remote.as_ref().map(|r| r.provider.clone()))
                    .push_bind(block.remote.as_ref().map(|r| r.id.clone()))
                    .push_bind(block.remote.as_ref().and_then(|r| r.class.clone()))
                    .push_bind(block.captured_at.map(|t| t.to_rfc3339()))
                    .push_bind(block.capture_location.map(|p| p.latitude))
                    .push_bind(block.capture_location.map(|p| p.longitude))
                    .push_bind(&now)
                    .push_bind(&now);
            });

            let result = qb.build().execute(&mut *tx).await?;

            // Rowids of a single multi-row INSERT are consecutive inside the
            // transaction, ending at last_insert_rowid().
            let last = result.last_insert_rowid();
            let first = last - chunk.len() as i64 + 1;
            ids.extend(first..=last);
        }

        let mut pairs: Vec<(i64, i64, Option<String>)> = Vec::new();
        for (block, id) in blocks.iter().zip(&ids) {
            let remote_at = block.remote_connected_at.map(|t| t.to_rfc3339());
            for collection_id in &block.collections_to_connect {
                pairs.push((*id, *collection_id, remote_at.clone()));
            }
            if let Some(collection_id) = connect_to {
                pairs.push((*id, collection_id, remote_at.clone()));
            }
        }

        for (block_id, collection_id, remote_at) in pairs {
            sqlx::query(
                "INSERT OR IGNORE INTO connections \
                 (block_id, collection_id, created_by, created_at, remote_created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(block_id)
            .bind(collection_id)
            .bind(created_by)
            .bind(&now)
            .bind(remote_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(ids)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Block>, sqlx::Error> {
        let row: Option<BlockRow> = sqlx::query_as(&format!("{} WHERE b.id = ?", BLOCK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BlockRow::into_block).transpose()
    }

    pub async fn list(&self) -> Result<Vec<Block>, sqlx::Error> {
        let rows: Vec<BlockRow> = sqlx::query_as(&format!(
            "{} ORDER BY b.created_at DESC, b.id DESC",
            BLOCK_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BlockRow::into_block).collect()
    }

    /// Updates the editable fields of a block in place.
    pub async fn update(&self, block: &Block) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE blocks
            SET title = ?, description = ?, content = ?, content_type = ?, source = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&block.title)
        .bind(&block.description)
        .bind(&block.content)
        .bind(&block.content_type)
        .bind(&block.source)
        .bind(Utc::now().to_rfc3339())
        .bind(block.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a block, returning the deleted row so callers can release any
    /// blob file it referenced. Connections go with it via FK cascade.
    pub async fn delete(&self, id: i64) -> Result<Option<Block>, sqlx::Error> {
        let block = self.get(id).await?;
        if block.is_some() {
            sqlx::query("DELETE FROM blocks WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(block)
    }

    /// Blocks connected to a collection, newest first, with an optional
    /// fixed-size window.
    pub async fn items_for_collection(
        &self,
        collection_id: i64,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Block>, sqlx::Error> {
        let mut sql = String::from(
            "SELECT b.*, \
             (SELECT COUNT(*) FROM connections cc WHERE cc.block_id = b.id) AS num_connections \
             FROM blocks b JOIN connections c ON c.block_id = b.id \
             WHERE c.collection_id = ? ORDER BY b.created_at DESC, b.id DESC",
        );
        if limit.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
        }

        let mut query = sqlx::query_as::<_, BlockRow>(&sql).bind(collection_id);
        if let Some(limit) = limit {
            query = query.bind(limit).bind(offset);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(BlockRow::into_block).collect()
    }

    /// Blocks in a collection that have not yet been pushed to a remote
    /// service.
    pub async fn pending_for_collection(
        &self,
        collection_id: i64,
    ) -> Result<Vec<Block>, sqlx::Error> {
        let rows: Vec<BlockRow> = sqlx::query_as(
            "SELECT b.*, \
             (SELECT COUNT(*) FROM connections cc WHERE cc.block_id = b.id) AS num_connections \
             FROM blocks b JOIN connections c ON c.block_id = b.id \
             WHERE c.collection_id = ? AND b.remote_source_id IS NULL \
             ORDER BY b.id",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BlockRow::into_block).collect()
    }

    /// Stamps a block with its remote identity after a successful push or on
    /// import.
    pub async fn set_remote(&self, id: i64, remote: &RemoteSource) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE blocks SET remote_source_type = ?, remote_source_id = ?, remote_class = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&remote.provider)
        .bind(&remote.id)
        .bind(&remote.class)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_remote_id(
        &self,
        provider: &str,
        remote_id: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM blocks WHERE remote_source_type = ? AND remote_source_id = ?",
        )
        .bind(provider)
        .bind(remote_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.0))
    }

    /// Case-insensitive substring search over title, description and content.
    pub async fn search(&self, query: &str) -> Result<Vec<Block>, sqlx::Error> {
        let pattern = format!("%{}%", query);
        let rows: Vec<BlockRow> = sqlx::query_as(&format!(
            "{} WHERE b.title LIKE ? OR b.description LIKE ? OR b.content LIKE ? \
             ORDER BY b.created_at DESC, b.id DESC",
            BLOCK_SELECT
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BlockRow::into_block).collect()
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
