//! Users context facade.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::types::UserId;
use sitepulse_entity::UserRole;

use crate::error::{ContextResult, ContextUnavailable};

/// The engine's simplified view of a platform user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub active: bool,
}

#[async_trait]
pub trait UserFacade: Send + Sync + 'static {
    /// Look up one user. `None` for unknown or deleted ids.
    async fn find_by_id(&self, id: UserId) -> ContextResult<Option<UserProfile>>;

    /// All active users holding the given role.
    async fn find_active_by_role(&self, role: UserRole) -> ContextResult<Vec<UserProfile>>;
}

/// Facade reading the Users context's own tables.
#[derive(Debug, Clone)]
pub struct PgUserFacade {
    pool: PgPool,
}

impl PgUserFacade {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserFacade for PgUserFacade {
    async fn find_by_id(&self, id: UserId) -> ContextResult<Option<UserProfile>> {
        sqlx::query_as::<_, UserProfile>(
            "SELECT id, name, email, role, active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("users", e))
    }

    async fn find_active_by_role(&self, role: UserRole) -> ContextResult<Vec<UserProfile>> {
        sqlx::query_as::<_, UserProfile>(
            "SELECT id, name, email, role, active FROM users \
             WHERE role = $1 AND active = TRUE ORDER BY name",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("users", e))
    }
}
