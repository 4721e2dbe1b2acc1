//! Personnel context facade.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::types::ProjectId;

use crate::error::{ContextResult, ContextUnavailable};

#[async_trait]
pub trait PersonnelFacade: Send + Sync + 'static {
    /// Attendance rate over the last seven days for a project's crew, as a
    /// fraction in `[0, 1]`. `None` when the project has no attendance
    /// records, which call sites must not treat as low attendance.
    async fn attendance_rate(&self, project_id: ProjectId) -> ContextResult<Option<f64>>;
}

/// Facade reading the Personnel context's own tables.
#[derive(Debug, Clone)]
pub struct PgPersonnelFacade {
    pool: PgPool,
}

impl PgPersonnelFacade {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonnelFacade for PgPersonnelFacade {
    async fn attendance_rate(&self, project_id: ProjectId) -> ContextResult<Option<f64>> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(CASE WHEN present THEN 1.0 ELSE 0.0 END)::float8 \
             FROM attendance_records \
             WHERE project_id = $1 AND recorded_at >= NOW() - INTERVAL '7 days'",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("personnel", e))
    }
}
