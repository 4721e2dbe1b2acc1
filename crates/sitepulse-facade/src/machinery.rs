//! Machinery context facade.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::types::ProjectId;

use crate::error::{ContextResult, ContextUnavailable};

#[async_trait]
pub trait MachineryFacade: Send + Sync + 'static {
    /// Count of machinery units in operating condition on a project.
    /// Unknown projects count zero.
    async fn active_count(&self, project_id: ProjectId) -> ContextResult<i64>;
}

/// Facade reading the Machinery context's own tables.
#[derive(Debug, Clone)]
pub struct PgMachineryFacade {
    pool: PgPool,
}

impl PgMachineryFacade {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MachineryFacade for PgMachineryFacade {
    async fn active_count(&self, project_id: ProjectId) -> ContextResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM machinery WHERE project_id = $1 AND status = 'active'",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("machinery", e))
    }
}
