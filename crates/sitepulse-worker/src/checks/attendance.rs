//! Attendance sweep.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sitepulse_core::config::ThresholdConfig;
use sitepulse_core::AppResult;
use sitepulse_engine::{NotificationCommandService, NotificationDraft};
use sitepulse_entity::notification::taxonomy::names;
use sitepulse_entity::{BoundedContext, NotificationPriority, UserRole};
use sitepulse_facade::{PersonnelFacade, ProjectFacade};

use super::EngineCheck;

/// Flags active projects whose crew attendance rate fell below the
/// configured minimum. Projects without attendance records are left alone.
pub struct AttendanceCheck {
    service: Arc<NotificationCommandService>,
    projects: Arc<dyn ProjectFacade>,
    personnel: Arc<dyn PersonnelFacade>,
    thresholds: ThresholdConfig,
}

impl AttendanceCheck {
    pub fn new(
        service: Arc<NotificationCommandService>,
        projects: Arc<dyn ProjectFacade>,
        personnel: Arc<dyn PersonnelFacade>,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            service,
            projects,
            personnel,
            thresholds,
        }
    }
}

#[async_trait]
impl EngineCheck for AttendanceCheck {
    fn name(&self) -> &'static str {
        "attendance_sweep"
    }

    async fn run(&self) -> AppResult<()> {
        let projects = match self.projects.find_active().await {
            Ok(projects) => projects,
            Err(error) => {
                warn!(%error, "projects context unavailable, skipping attendance sweep");
                return Ok(());
            }
        };

        for project in projects {
            let rate = match self.personnel.attendance_rate(project.id).await {
                Ok(Some(rate)) => rate,
                Ok(None) => continue,
                Err(error) => {
                    warn!(%error, project_id = %project.id, "personnel context unavailable");
                    continue;
                }
            };
            if rate >= self.thresholds.min_attendance_rate {
                continue;
            }

            let draft = NotificationDraft::new(
                names::LOW_ATTENDANCE,
                BoundedContext::Personnel,
                NotificationPriority::High,
                format!("Low attendance on {}", project.name),
                format!(
                    "{} averaged {:.0}% attendance this week, below the {:.0}% minimum",
                    project.name,
                    rate * 100.0,
                    self.thresholds.min_attendance_rate * 100.0
                ),
            )
            .with_action(format!("/projects/{}/personnel", project.id), "Review attendance");
            if let Err(error) = self
                .service
                .create_for_project(project.id, UserRole::Manager, draft)
                .await
            {
                warn!(%error, project_id = %project.id, "attendance alert failed");
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
    async fn test_low_attendance_is_flagged_but_no_records_is_not() {
        let manager = profile(UserRole::Manager);
        let low = project(manager.id, None);
        let unknown = project(manager.id, None);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        ctx.add_project(low.clone());
        ctx.add_project(unknown.clone());
        ctx.set_attendance_rate(low.id, 0.62);
        let f = engine_fixture(ctx);

        let check = AttendanceCheck::new(
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
        assert_eq!(inbox[0].type_name, names::LOW_ATTENDANCE);
        assert_eq!(inbox[0].related_project_id, Some(low.id));
        assert!(inbox[0].content.message.contains("62%"));
    }
}
