//! Explicit session context.
//!
//! The current user's identity record is loaded once at startup and passed
//! into the data access layer and sync engine, rather than being ambient
//! global state. Rows record `created_by = user.id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kv::{KvError, KvStore};

const USER_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserRecord,
}

impl Session {
    /// Loads the persisted identity record, creating one on first run.
    pub fn load_or_create(kv: &KvStore) -> Result<Self, KvError> {
        if let Some(user) = kv.get::<UserRecord>(USER_KEY)? {
            return Ok(Self { user });
        }

        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: None,
            created_at: Utc::now(),
        };
        kv.set(USER_KEY, &user)?;

        Ok(Self { user })
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            user: UserRecord {
                id: "test-user".to_string(),
                email: None,
                created_at: Utc::now(),
            },
        }
    }
}
