use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};

/// Change represents one submitted change event
/// Maps to `changes` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Change {
    pub id: String,
    pub title: String,
    pub status: String,
    /// Seconds since the Unix epoch
    pub created_at: f64,
}

/// New Change for creation, already validated and stamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChange {
    pub id: String,
    pub title: String,
    pub status: String,
    pub created_at: f64,
}

impl From<NewChange> for Change {
    fn from(new_change: NewChange) -> Self {
        Self {
            id: new_change.id,
            title: new_change.title,
            status: new_change.status,
            created_at: new_change.created_at,
        }
    }
}

impl Change {
    /// Insert a new change row; a duplicate id surfaces as a unique violation
    pub async fn create<'e, E>(executor: E, new_change: &NewChange) -> Result<Change, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Change>(
            r#"
            INSERT INTO changes (id, title, status, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, status, created_at
            "#,
        )
        .bind(&new_change.id)
        .bind(&new_change.title)
        .bind(&new_change.status)
        .bind(new_change.created_at)
        .fetch_one(executor)
        .await
    }

    /// Find a change by its producer-assigned id
    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Change>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Change>(
            r#"
            SELECT id, title, status, created_at
            FROM changes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// List all changes, oldest first
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Change>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Change>(
            r#"
            SELECT id, title, status, created_at
            FROM changes
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(executor)
        .await
    }
}
