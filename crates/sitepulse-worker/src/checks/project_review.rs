//! Weekly review reminder for project managers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc, Weekday};
use tracing::warn;

use sitepulse_core::AppResult;
use sitepulse_engine::{NotificationCommandService, NotificationDraft};
use sitepulse_entity::notification::taxonomy::names;
use sitepulse_entity::{BoundedContext, NotificationPriority, UserRole};
use sitepulse_facade::ProjectFacade;

use super::{DailyGate, EngineCheck};

/// Prompts each active project's manager to review project status once
/// a week. Due on Mondays; the gate keeps repeated cycles on the same
/// Monday from sending duplicates.
pub struct ProjectReviewCheck {
    service: Arc<NotificationCommandService>,
    projects: Arc<dyn ProjectFacade>,
    gate: DailyGate,
}

impl ProjectReviewCheck {
    pub fn new(service: Arc<NotificationCommandService>, projects: Arc<dyn ProjectFacade>) -> Self {
        Self {
            service,
            projects,
            gate: DailyGate::new(),
        }
    }
}

#[async_trait]
impl EngineCheck for ProjectReviewCheck {
    fn name(&self) -> &'static str {
        "weekly_project_review"
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        now.weekday() == Weekday::Mon
    }

    async fn run(&self) -> AppResult<()> {
        let now = Utc::now();
        if self.gate.is_claimed(now) {
            return Ok(());
        }

        // A facade outage must not consume the daily slot, so the gate is
        // only claimed once the project list is in hand.
        let projects = match self.projects.find_active().await {
            Ok(projects) => projects,
            Err(error) => {
                warn!(%error, "projects context unavailable, weekly review postponed");
                return Ok(());
            }
        };
        if !self.gate.try_claim(now) {
            return Ok(());
        }

        for project in projects {
            let draft = NotificationDraft::new(
                names::PROJECT_STATUS_CHANGED,
                BoundedContext::Projects,
                NotificationPriority::Normal,
                format!("Weekly review: {}", project.name),
                format!(
                    "Time for the weekly status review of {}. Check progress, stock and open incidents.",
                    project.name
                ),
            )
            .with_action(format!("/projects/{}", project.id), "Open project");
            if let Err(error) = self
                .service
                .create_for_project(project.id, UserRole::Manager, draft)
                .await
            {
                warn!(%error, project_id = %project.id, "weekly review reminder failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sitepulse_facade::InMemoryContext;

    use sitepulse_database::NotificationStore;

    use crate::testutil::{engine_fixture, profile, project};

    #[test]
    fn test_due_only_on_mondays() {
        let f = engine_fixture(InMemoryContext::new());
        let check = ProjectReviewCheck::new(f.service, f.ctx);
        // 2026-03-02 is a Monday, 2026-03-03 a Tuesday.
        let monday = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap();
        assert!(check.is_due(monday));
        assert!(!check.is_due(tuesday));
    }

    #[tokio::test]
    async fn test_outage_does_not_consume_the_daily_slot() {
        let manager = profile(UserRole::Manager);
        let site = project(manager.id, None);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        ctx.add_project(site.clone());
        let f = engine_fixture(ctx);
        let check = ProjectReviewCheck::new(f.service.clone(), f.ctx.clone());

        f.ctx.fail_context("projects");
        check.run().await.unwrap();
        assert!(f
            .notifications
            .find_recent_for_user(manager.id, 10)
            .await
            .unwrap()
            .is_empty());

        // The outage clears later the same day and the review still goes out.
        f.ctx.recover_context("projects");
        check.run().await.unwrap();
        let inbox = f
            .notifications
            .find_recent_for_user(manager.id, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
    }

    #[tokio::test]
    async fn test_runs_once_per_day_and_notifies_each_manager() {
        let manager = profile(UserRole::Manager);
        let site = project(manager.id, None);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        ctx.add_project(site.clone());
        let f = engine_fixture(ctx);

        let check = ProjectReviewCheck::new(f.service.clone(), f.ctx.clone());
        check.run().await.unwrap();
        check.run().await.unwrap();

        let inbox = f
            .notifications
            .find_recent_for_user(manager.id, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].type_name, names::PROJECT_STATUS_CHANGED);
        assert_eq!(inbox[0].related_project_id, Some(site.id));
    }
}
