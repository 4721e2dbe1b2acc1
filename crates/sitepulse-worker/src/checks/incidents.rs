//! Open-incident backlog sweep.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sitepulse_core::config::ThresholdConfig;
use sitepulse_core::AppResult;
use sitepulse_engine::{NotificationCommandService, NotificationDraft};
use sitepulse_entity::notification::taxonomy::names;
use sitepulse_entity::{BoundedContext, NotificationPriority, UserRole};
use sitepulse_facade::{IncidentFacade, ProjectFacade};

use super::EngineCheck;

/// Flags active projects whose open-incident backlog exceeds the
/// configured maximum.
pub struct IncidentBacklogCheck {
    service: Arc<NotificationCommandService>,
    projects: Arc<dyn ProjectFacade>,
    incidents: Arc<dyn IncidentFacade>,
    thresholds: ThresholdConfig,
}

impl IncidentBacklogCheck {
    pub fn new(
        service: Arc<NotificationCommandService>,
        projects: Arc<dyn ProjectFacade>,
        incidents: Arc<dyn IncidentFacade>,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            service,
            projects,
            incidents,
            thresholds,
        }
    }
}

#[async_trait]
impl EngineCheck for IncidentBacklogCheck {
    fn name(&self) -> &'static str {
        "incident_backlog_sweep"
    }

    async fn run(&self) -> AppResult<()> {
        let projects = match self.projects.find_active().await {
            Ok(projects) => projects,
            Err(error) => {
                warn!(%error, "projects context unavailable, skipping incident sweep");
                return Ok(());
            }
        };

        for project in projects {
            let open = match self.incidents.open_count(project.id).await {
                Ok(open) => open,
                Err(error) => {
                    warn!(%error, project_id = %project.id, "incidents context unavailable");
                    continue;
                }
            };
            if open <= self.thresholds.max_open_incidents {
                continue;
            }

            let draft = NotificationDraft::new(
                names::INCIDENT_BACKLOG,
                BoundedContext::Incidents,
                NotificationPriority::High,
                format!("Incident backlog on {}", project.name),
                format!(
                    "{} has {} unresolved incidents, above the limit of {}",
                    project.name, open, self.thresholds.max_open_incidents
                ),
            )
            .with_action(format!("/projects/{}/incidents", project.id), "Review incidents");
            if let Err(error) = self
                .service
                .create_for_project(project.id, UserRole::Manager, draft)
                .await
            {
                warn!(%error, project_id = %project.id, "incident backlog alert failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_facade::InMemoryContext;

    use sitepulse_database::NotificationStore;

    use crate::testutil::{engine_fixture, profile, project};

    #[tokio::test]
    async fn test_backlog_above_the_limit_is_flagged() {
        let manager = profile(UserRole::Manager);
        let p = project(manager.id, None);
        let quiet = project(manager.id, None);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        ctx.add_project(p.clone());
        ctx.add_project(quiet.clone());
        ctx.set_open_incidents(p.id, 6);
        // Exactly the limit is still acceptable.
        ctx.set_open_incidents(quiet.id, 5);
        let f = engine_fixture(ctx);

        let check = IncidentBacklogCheck::new(
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
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].type_name, names::INCIDENT_BACKLOG);
        assert_eq!(inbox[0].related_project_id, Some(p.id));
        assert!(inbox[0].content.message.contains("6 unresolved"));
    }
}
