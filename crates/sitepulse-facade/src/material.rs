//! Materials context facade.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::types::{MaterialId, ProjectId};

use crate::error::{ContextResult, ContextUnavailable};

/// Stock level view of a material assigned to a project.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MaterialStock {
    pub id: MaterialId,
    pub name: String,
    pub stock: i32,
    pub minimum_stock: i32,
}

impl MaterialStock {
    /// Stock as a fraction of the configured minimum. A material with a
    /// zero minimum never counts as low.
    pub fn stock_ratio(&self) -> f64 {
        if self.minimum_stock <= 0 {
            return f64::INFINITY;
        }
        f64::from(self.stock) / f64::from(self.minimum_stock)
    }
}

#[async_trait]
pub trait MaterialFacade: Send + Sync + 'static {
    /// Materials of a project whose stock is at or below the minimum.
    async fn low_stock_for_project(&self, project_id: ProjectId)
        -> ContextResult<Vec<MaterialStock>>;
}

/// Facade reading the Materials context's own tables.
#[derive(Debug, Clone)]
pub struct PgMaterialFacade {
    pool: PgPool,
}

impl PgMaterialFacade {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MaterialFacade for PgMaterialFacade {
    async fn low_stock_for_project(
        &self,
        project_id: ProjectId,
    ) -> ContextResult<Vec<MaterialStock>> {
        sqlx::query_as::<_, MaterialStock>(
            "SELECT id, name, stock, minimum_stock FROM materials \
             WHERE project_id = $1 AND minimum_stock > 0 AND stock <= minimum_stock \
             ORDER BY name",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("materials", e))
    }
}
