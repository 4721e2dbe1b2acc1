//! Incidents context facade.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::types::ProjectId;

use crate::error::{ContextResult, ContextUnavailable};

#[async_trait]
pub trait IncidentFacade: Send + Sync + 'static {
    /// Count of unresolved incidents on a project. Unknown projects count
    /// zero.
    async fn open_count(&self, project_id: ProjectId) -> ContextResult<i64>;
}

/// Facade reading the Incidents context's own tables.
#[derive(Debug, Clone)]
pub struct PgIncidentFacade {
    pool: PgPool,
}

impl PgIncidentFacade {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentFacade for PgIncidentFacade {
    async fn open_count(&self, project_id: ProjectId) -> ContextResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM incidents WHERE project_id = $1 AND status = 'open'",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("incidents", e))
    }
}
