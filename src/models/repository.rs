//! Repository row

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Name of the default branch; this branch cannot be deleted
    pub head: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    pub fn new(owner_id: Uuid, name: impl Into<String>, head: impl Into<String>) -> Self {
        let now = Utc::now();
        Repository {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            head: head.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}
