//! Machinery availability sweep.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sitepulse_core::config::ThresholdConfig;
use sitepulse_core::AppResult;
use sitepulse_engine::{NotificationCommandService, NotificationDraft};
use sitepulse_entity::notification::taxonomy::names;
use sitepulse_entity::{BoundedContext, NotificationPriority, UserRole};
use sitepulse_facade::{MachineryFacade, ProjectFacade};

use super::EngineCheck;

/// Flags active projects running with fewer operating machinery units than
/// the configured minimum.
pub struct MachineryCheck {
    service: Arc<NotificationCommandService>,
    projects: Arc<dyn ProjectFacade>,
    machinery: Arc<dyn MachineryFacade>,
    thresholds: ThresholdConfig,
}

impl MachineryCheck {
    pub fn new(
        service: Arc<NotificationCommandService>,
        projects: Arc<dyn ProjectFacade>,
        machinery: Arc<dyn MachineryFacade>,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            service,
            projects,
            machinery,
            thresholds,
        }
    }
}

#[async_trait]
impl EngineCheck for MachineryCheck {
    fn name(&self) -> &'static str {
        "machinery_sweep"
    }

    async fn run(&self) -> AppResult<()> {
        let projects = match self.projects.find_active().await {
            Ok(projects) => projects,
            Err(error) => {
                warn!(%error, "projects context unavailable, skipping machinery sweep");
                return Ok(());
            }
        };

        for project in projects {
            let active = match self.machinery.active_count(project.id).await {
                Ok(active) => active,
                Err(error) => {
                    warn!(%error, project_id = %project.id, "machinery context unavailable");
                    continue;
                }
            };
            if active >= self.thresholds.min_active_machinery {
                continue;
            }

            let draft = NotificationDraft::new(
                names::MACHINERY_SHORTAGE,
                BoundedContext::Machinery,
                NotificationPriority::High,
                format!("Machinery shortage on {}", project.name),
                format!(
                    "{} has only {} active machinery unit(s), minimum is {}",
                    project.name, active, self.thresholds.min_active_machinery
                ),
            )
            .with_action(format!("/projects/{}/machinery", project.id), "Review machinery");
            if let Err(error) = self
                .service
                .create_for_project(project.id, UserRole::Manager, draft)
                .await
            {
                warn!(%error, project_id = %project.id, "machinery alert failed");
            }
        }
        Ok(())
    }
}
