//! Low-stock sweep.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sitepulse_core::config::ThresholdConfig;
use sitepulse_core::AppResult;
use sitepulse_engine::{NotificationCommandService, NotificationDraft};
use sitepulse_entity::notification::taxonomy::names;
use sitepulse_entity::{BoundedContext, NotificationPriority, UserRole};
use sitepulse_facade::{MaterialFacade, ProjectFacade, ProjectSummary};

use super::EngineCheck;

/// Flags materials whose stock fell to or below the minimum. Stock at or
/// below the critical fraction of the minimum escalates to a
/// non-suppressible critical alert.
pub struct StockCheck {
    service: Arc<NotificationCommandService>,
    projects: Arc<dyn ProjectFacade>,
    materials: Arc<dyn MaterialFacade>,
    thresholds: ThresholdConfig,
}

impl StockCheck {
    pub fn new(
        service: Arc<NotificationCommandService>,
        projects: Arc<dyn ProjectFacade>,
        materials: Arc<dyn MaterialFacade>,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            service,
            projects,
            materials,
            thresholds,
        }
    }

    async fn sweep_project(&self, project: &ProjectSummary) -> AppResult<()> {
        let low = match self.materials.low_stock_for_project(project.id).await {
            Ok(low) => low,
            Err(error) => {
                warn!(%error, project_id = %project.id, "materials context unavailable, skipping");
                return Ok(());
            }
        };

        for material in low {
            let critical = material.stock_ratio() <= self.thresholds.critical_stock_ratio;
            let (type_name, priority, title) = if critical {
                (
                    names::CRITICAL_STOCK,
                    NotificationPriority::Critical,
                    format!("Critical stock: {}", material.name),
                )
            } else {
                (
                    names::LOW_STOCK,
                    NotificationPriority::Normal,
                    format!("Low stock: {}", material.name),
                )
            };
            let draft = NotificationDraft::new(
                type_name,
                BoundedContext::Materials,
                priority,
                title,
                format!(
                    "{} has {} units left on {} (minimum {})",
                    material.name, material.stock, project.name, material.minimum_stock
                ),
            )
            .with_action(format!("/projects/{}/materials", project.id), "Review stock")
            .with_related_entity(material.id.into_uuid(), "material");

            self.service
                .create_for_project(project.id, UserRole::Manager, draft)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EngineCheck for StockCheck {
    fn name(&self) -> &'static str {
        "stock_sweep"
    }

    async fn run(&self) -> AppResult<()> {
        let projects = match self.projects.find_active().await {
            Ok(projects) => projects,
            Err(error) => {
                warn!(%error, "projects context unavailable, skipping stock sweep");
                return Ok(());
            }
        };
        for project in projects {
            if let Err(error) = self.sweep_project(&project).await {
                warn!(%error, project_id = %project.id, "stock sweep failed for project");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_core::types::MaterialId;
    use sitepulse_facade::{InMemoryContext, MaterialStock};

    use sitepulse_database::NotificationStore;

    use crate::testutil::{engine_fixture, profile, project};

    fn material(name: &str, stock: i32, minimum: i32) -> MaterialStock {
        MaterialStock {
            id: MaterialId::new(),
            name: name.to_string(),
            stock,
            minimum_stock: minimum,
        }
    }

    #[tokio::test]
    async fn test_half_minimum_escalates_to_critical() {
        let manager = profile(UserRole::Manager);
        let p = project(manager.id, None);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        ctx.add_project(p.clone());
        // 2 of 10: critical. 6 of 10: merely low.
        ctx.add_low_stock(p.id, material("Cement", 2, 10));
        ctx.add_low_stock(p.id, material("Rebar", 6, 10));
        let f = engine_fixture(ctx);

        let check = StockCheck::new(
            f.service.clone(),
            f.ctx.clone(),
            f.ctx.clone(),
            ThresholdConfig::default(),
        );
        check.run().await.unwrap();

        let inbox = f
            .notifications
            .find_recent_for_user(manager.id, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 2);
        let critical = inbox
            .iter()
            .find(|n| n.type_name == names::CRITICAL_STOCK)
            .unwrap();
        assert_eq!(critical.priority, NotificationPriority::Critical);
        assert!(critical.content.message.contains("Cement"));
        let low = inbox.iter().find(|n| n.type_name == names::LOW_STOCK).unwrap();
        assert_eq!(low.priority, NotificationPriority::Normal);
        assert!(low.content.message.contains("Rebar"));
    }

    #[tokio::test]
    async fn test_materials_outage_is_tolerated() {
        let manager = profile(UserRole::Manager);
        let p = project(manager.id, None);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        ctx.add_project(p);
        ctx.fail_context("materials");
        let f = engine_fixture(ctx);

        let check = StockCheck::new(
            f.service.clone(),
            f.ctx.clone(),
            f.ctx.clone(),
            ThresholdConfig::default(),
        );
        check.run().await.unwrap();
        assert!(f
            .notifications
            .find_recent_for_user(manager.id, 10)
            .await
            .unwrap()
            .is_empty());
    }
}
