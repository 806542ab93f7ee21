use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::Connection;

use super::{parse_timestamp, parse_timestamp_opt};

pub struct ConnectionRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    block_id: i64,
    collection_id: i64,
    created_by: String,
    created_at: String,
    remote_created_at: Option<String>,
}

impl ConnectionRow {
    fn into_connection(self) -> Connection {
        Connection {
            block_id: self.block_id,
            collection_id: self.collection_id,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at),
            remote_created_at: parse_timestamp_opt(self.remote_created_at.as_deref()),
        }
    }
}

impl ConnectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects a block to each given collection. Existing pairs are left
    /// untouched; the insert is idempotent. Returns the number of rows
    /// actually inserted.
    pub async fn add(
        &self,
        block_id: i64,
        collection_ids: &[i64],
        created_by: &str,
        remote_created_at: Option<DateTime<Utc>>,
    ) -> Result<u64, sqlx::Error> {
        if collection_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        for collection_id in collection_ids {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO connections \
                 (block_id, collection_id, created_by, created_at, remote_created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(block_id)
            .bind(collection_id)
            .bind(created_by)
            .bind(&now)
            .bind(remote_created_at.map(|t| t.to_rfc3339()))
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    /// Sets the connection set for a block to exactly `collection_ids`:
    /// pairs not in the list are deleted, missing pairs inserted, in one
    /// transaction.
    pub async fn replace(
        &self,
        block_id: i64,
        collection_ids: &[i64],
        created_by: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if collection_ids.is_empty() {
            sqlx::query("DELETE FROM connections WHERE block_id = ?")
                .bind(block_id)
                .execute(&mut *tx)
                .await?;
        } else {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM connections WHERE block_id = ");
            qb.push_bind(block_id);
            qb.push(" AND collection_id NOT IN (");
            let mut ids = qb.separated(", ");
            for collection_id in collection_ids {
                ids.push_bind(*collection_id);
            }
            ids.push_unseparated(")");
            qb.build().execute(&mut *tx).await?;

            let now = Utc::now().to_rfc3339();
            for collection_id in collection_ids {
                sqlx::query(
                    "INSERT OR IGNORE INTO connections \
                     (block_id, collection_id, created_by, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(block_id)
                .bind(collection_id)
                .bind(created_by)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(())
    }

    /// Removes a single connection. Returns false when the pair did not
    /// exist.
    pub async fn remove(&self, block_id: i64, collection_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM connections WHERE block_id = ? AND collection_id = ?")
            .bind(block_id)
            .bind(collection_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn for_block(&self, block_id: i64) -> Result<Vec<Connection>, sqlx::Error> {
        let rows: Vec<ConnectionRow> = sqlx::query_as(
            "SELECT * FROM connections WHERE block_id = ? ORDER BY created_at, collection_id",
        )
        .bind(block_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ConnectionRow::into_connection).collect())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM connections")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, BlockRepository, CollectionRepository};
    use crate::models::{NewBlock, NewCollection};
    use tempfile::TempDir;

    struct TestContext {
        blocks: BlockRepository,
        collections: CollectionRepository,
        connections: ConnectionRepository,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            blocks: BlockRepository::new(pool.clone()),
            collections: CollectionRepository::new(pool.clone()),
            connections: ConnectionRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    async fn make_block(ctx: &TestContext) -> i64 {
        ctx.blocks
            .create(&NewBlock::text("block"), "user1")
            .await
            .unwrap()
    }

    async fn make_collection(ctx: &TestContext, title: &str) -> i64 {
        ctx.collections
            .create(&NewCollection::new(title), "user1")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let ctx = setup().await;
        let block = make_block(&ctx).await;
        let collection = make_collection(&ctx, "A").await;

        let first = ctx
            .connections
            .add(block, &[collection], "user1", None)
            .await
            .unwrap();
        let second = ctx
            .connections
            .add(block, &[collection], "user1", None)
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(ctx.connections.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_reconciles_set() {
        let ctx = setup().await;
        let block = make_block(&ctx).await;
        let a = make_collection(&ctx, "A").await;
        let b = make_collection(&ctx, "B").await;
        let c = make_collection(&ctx, "C").await;
        let d = make_collection(&ctx, "D").await;

        ctx.connections
            .add(block, &[a, b, c], "user1", None)
            .await
            .unwrap();

        ctx.connections.replace(block, &[b, d], "user1").await.unwrap();

        let current: Vec<i64> = ctx
            .connections
            .for_block(block)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.collection_id)
            .collect();
        assert_eq!(current.len(), 2);
        assert!(current.contains(&b));
        assert!(current.contains(&d));
    }

    #[tokio::test]
    async fn test_replace_with_empty_disconnects_all() {
        let ctx = setup().await;
        let block = make_block(&ctx).await;
        let a = make_collection(&ctx, "A").await;
        let b = make_collection(&ctx, "B").await;

        ctx.connections
            .add(block, &[a, b], "user1", None)
            .await
            .unwrap();
        ctx.connections.replace(block, &[], "user1").await.unwrap();

        assert!(ctx.connections.for_block(block).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_keeps_existing_created_at() {
        let ctx = setup().await;
        let block = make_block(&ctx).await;
        let a = make_collection(&ctx, "A").await;

        ctx.connections.add(block, &[a], "user1", None).await.unwrap();
        let before = ctx.connections.for_block(block).await.unwrap()[0].created_at;

        ctx.connections.replace(block, &[a], "user1").await.unwrap();
        let after = ctx.connections.for_block(block).await.unwrap()[0].created_at;

        // Surviving pair is untouched, not reinserted
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_remove() {
        let ctx = setup().await;
        let block = make_block(&ctx).await;
        let a = make_collection(&ctx, "A").await;

        ctx.connections.add(block, &[a], "user1", None).await.unwrap();

        assert!(ctx.connections.remove(block, a).await.unwrap());
        assert!(!ctx.connections.remove(block, a).await.unwrap());
    }

    #[tokio::test]
    async fn test_remote_created_at_persists() {
        let ctx = setup().await;
        let block = make_block(&ctx).await;
        let a = make_collection(&ctx, "A").await;
        let remote_time = Utc::now();

        ctx.connections
            .add(block, &[a], "user1", Some(remote_time))
            .await
            .unwrap();

        let connection = &ctx.connections.for_block(block).await.unwrap()[0];
        assert_eq!(
            connection.remote_created_at.map(|t| t.timestamp()),
            Some(remote_time.timestamp())
        );
    }
}
