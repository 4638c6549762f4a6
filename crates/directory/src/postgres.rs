use async_trait::async_trait;
use occasio_core::{MessageType, User, UserId};
use sqlx::PgPool;

use crate::{DirectoryError, DirectoryResult, UserDirectory};

/// Postgres-backed `UserDirectory`. Owns no write path; CRUD on `users`
/// lives entirely in the out-of-scope API surface.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn by_id(&self, id: UserId) -> DirectoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DirectoryError::Storage)?;

        Ok(user)
    }

    async fn with_occasion_on(
        &self,
        month: u32,
        day: u32,
        message_type: MessageType,
    ) -> DirectoryResult<Vec<User>> {
        let column = match message_type {
            MessageType::Birthday => "birthday_date",
            MessageType::Anniversary => "anniversary_date",
        };

        // column is one of two fixed literals above, never user input.
        let query = format!(
            r#"
            SELECT * FROM users
            WHERE deleted_at IS NULL
              AND {column} IS NOT NULL
              AND EXTRACT(MONTH FROM {column}) = $1
              AND EXTRACT(DAY FROM {column}) = $2
            "#
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(month as f64)
            .bind(day as f64)
            .fetch_all(&self.pool)
            .await
            .map_err(DirectoryError::Storage)?;

        Ok(users)
    }
}
