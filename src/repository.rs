use crate::models::{DirectoryRecord, Role};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

const RECORD_COLUMNS: &str = "id, email, name, role, is_approved, created_at, updated_at";

/// Repository Trait
///
/// Persistence contract for staff directory records. Handlers and the in-process
/// directory use it through `Arc<dyn Repository>`, so tests can swap in a mock.
///
/// Unlike a best-effort read path, every method surfaces `sqlx::Error`: the gate must be
/// able to tell "user absent" from "database down".
#[async_trait]
pub trait Repository: Send + Sync {
    /// Exact, case-insensitive email match, oldest record first.
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<DirectoryRecord>, sqlx::Error>;
    async fn get_user(&self, id: Uuid) -> Result<Option<DirectoryRecord>, sqlx::Error>;
    async fn list_users(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error>;
    /// Users waiting for approval, oldest first.
    async fn list_pending_users(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error>;

    // --- Mutations ---
    // Both return None when no user has the given id.
    async fn set_user_approval(
        &self,
        id: Uuid,
        is_approved: bool,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error>;
    async fn set_user_role(
        &self,
        id: Uuid,
        role: Option<Role>,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error>;
}

pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the `public.users` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM users WHERE lower(email) = lower($1) ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, DirectoryRecord>(&sql)
            .bind(email.trim())
            .fetch_all(&self.pool)
            .await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, DirectoryRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_users(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, DirectoryRecord>(&sql)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_pending_users(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM users WHERE is_approved = false ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, DirectoryRecord>(&sql)
            .fetch_all(&self.pool)
            .await
    }

    async fn set_user_approval(
        &self,
        id: Uuid,
        is_approved: bool,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET is_approved = $2, updated_at = now() WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, DirectoryRecord>(&sql)
            .bind(id)
            .bind(is_approved)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_user_role(
        &self,
        id: Uuid,
        role: Option<Role>,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, DirectoryRecord>(&sql)
            .bind(id)
            .bind(role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await
    }
}
