use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{Collection, NewCollection, RemoteSource};

use super::{parse_timestamp, parse_timestamp_opt};

/// `latest_content` is the thumbnail fallback: the content of the most
/// recently connected block. The stored `thumbnail` column stays an
/// explicit override only.
const COLLECTION_SELECT: &str = "SELECT col.id, col.title, col.description, col.thumbnail, \
     (SELECT b.content FROM connections c2 JOIN blocks b ON b.id = c2.block_id \
      WHERE c2.collection_id = col.id \
      ORDER BY c2.created_at DESC, b.id DESC LIMIT 1) AS latest_content, \
     col.created_by, col.remote_source_type, col.remote_source_id, \
     col.created_at, col.updated_at, \
     (SELECT COUNT(*) FROM connections c WHERE c.collection_id = col.id) AS num_blocks, \
     (SELECT MAX(c.created_at) FROM connections c WHERE c.collection_id = col.id) AS last_connected_at \
     FROM collections col";

pub struct CollectionRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CollectionRow {
    id: i64,
    title: String,
    description: Option<String>,
    thumbnail: Option<String>,
    latest_content: Option<String>,
    created_by: String,
    remote_source_type: Option<String>,
    remote_source_id: Option<String>,
    created_at: String,
    updated_at: String,
    num_blocks: i64,
    last_connected_at: Option<String>,
}

impl CollectionRow {
    fn into_collection(self) -> Collection {
        let remote = match (self.remote_source_type, self.remote_source_id) {
            (Some(provider), Some(id)) => Some(RemoteSource {
                provider,
                id,
                class: None,
            }),
            _ => None,
        };

        Collection {
            id: self.id,
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail,
            latest_content: self.latest_content,
            created_by: self.created_by,
            remote,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
            num_blocks: self.num_blocks,
            last_connected_at: parse_timestamp_opt(self.last_connected_at.as_deref()),
        }
    }
}

impl CollectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        collection: &NewCollection,
        created_by: &str,
    ) -> Result<i64, sqlx::Error> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO collections (title, description, thumbnail, created_by,
                                     remote_source_type, remote_source_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&collection.title)
        .bind(&collection.description)
        .bind(&collection.thumbnail)
        .bind(created_by)
        .bind(collection.remote.as_ref().map(|r| r.provider.as_str()))
        .bind(collection.remote.as_ref().map(|r| r.id.as_str()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Collection>, sqlx::Error> {
        let row: Option<CollectionRow> =
            sqlx::query_as(&format!("{} WHERE col.id = ?", COLLECTION_SELECT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(CollectionRow::into_collection))
    }

    pub async fn list(&self) -> Result<Vec<Collection>, sqlx::Error> {
        let rows: Vec<CollectionRow> = sqlx::query_as(&format!(
            "{} ORDER BY col.created_at DESC, col.id DESC",
            COLLECTION_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CollectionRow::into_collection).collect())
    }

    /// Updates the editable fields of a collection in place.
    pub async fn update(&self, collection: &Collection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE collections SET title = ?, description = ?, thumbnail = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&collection.title)
        .bind(&collection.description)
        .bind(&collection.thumbnail)
        .bind(Utc::now().to_rfc3339())
        .bind(collection.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a collection. Its connections go via FK cascade; the blocks
    /// themselves survive.
    pub async fn delete(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Links a collection to a remote channel.
    pub async fn link_remote(&self, id: i64, remote: &RemoteSource) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE collections SET remote_source_type = ?, remote_source_id = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&remote.provider)
        .bind(&remote.id)
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
    ) -> Result<Option<Collection>, sqlx::Error> {
        let row: Option<CollectionRow> = sqlx::query_as(&format!(
            "{} WHERE col.remote_source_type = ? AND col.remote_source_id = ?",
            COLLECTION_SELECT
        ))
        .bind(provider)
        .bind(remote_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CollectionRow::into_collection))
    }

    /// All collections mirrored to a remote channel.
    pub async fn remote_linked(&self) -> Result<Vec<Collection>, sqlx::Error> {
        let rows: Vec<CollectionRow> = sqlx::query_as(&format!(
            "{} WHERE col.remote_source_id IS NOT NULL ORDER BY col.id",
            COLLECTION_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CollectionRow::into_collection).collect())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM collections")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
