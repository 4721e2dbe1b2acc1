//! Projects context facade.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::types::{ProjectId, UserId};

use crate::error::{ContextResult, ContextUnavailable};

/// The engine's simplified view of a construction project.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub manager_id: UserId,
    /// Not every project has a supervisor assigned yet.
    pub supervisor_id: Option<UserId>,
    pub active: bool,
}

#[async_trait]
pub trait ProjectFacade: Send + Sync + 'static {
    /// Look up one project. `None` for unknown ids.
    async fn find_by_id(&self, id: ProjectId) -> ContextResult<Option<ProjectSummary>>;

    /// All projects currently in an active state.
    async fn find_active(&self) -> ContextResult<Vec<ProjectSummary>>;
}

/// Facade reading the Projects context's own tables.
#[derive(Debug, Clone)]
pub struct PgProjectFacade {
    pool: PgPool,
}

impl PgProjectFacade {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectFacade for PgProjectFacade {
    async fn find_by_id(&self, id: ProjectId) -> ContextResult<Option<ProjectSummary>> {
        sqlx::query_as::<_, ProjectSummary>(
            "SELECT id, name, manager_id, supervisor_id, active FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("projects", e))
    }

    async fn find_active(&self) -> ContextResult<Vec<ProjectSummary>> {
        sqlx::query_as::<_, ProjectSummary>(
            "SELECT id, name, manager_id, supervisor_id, active FROM projects \
             WHERE active = TRUE ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("projects", e))
    }
}
