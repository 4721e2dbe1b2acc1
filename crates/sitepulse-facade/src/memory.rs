//! Fixture-backed implementation of every context facade.
//!
//! Used by unit tests and development mode. Populate the fixture with the
//! builder methods, then share it behind an `Arc`. Contexts can be marked
//! as failing to exercise the outage-tolerant call sites.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use sitepulse_core::types::{ProjectId, UserId};
use sitepulse_entity::UserRole;

use crate::error::{ContextResult, ContextUnavailable};
use crate::incident::IncidentFacade;
use crate::machinery::MachineryFacade;
use crate::material::{MaterialFacade, MaterialStock};
use crate::personnel::PersonnelFacade;
use crate::project::{ProjectFacade, ProjectSummary};
use crate::settings::{SettingsFacade, UserSettings};
use crate::user::{UserFacade, UserProfile};

/// In-memory stand-in for all seven bounded contexts.
#[derive(Debug, Default)]
pub struct InMemoryContext {
    users: HashMap<UserId, UserProfile>,
    projects: HashMap<ProjectId, ProjectSummary>,
    low_stock: HashMap<ProjectId, Vec<MaterialStock>>,
    active_machinery: HashMap<ProjectId, i64>,
    open_incidents: HashMap<ProjectId, i64>,
    attendance: HashMap<ProjectId, f64>,
    settings: HashMap<UserId, UserSettings>,
    // Interior mutability so outages can be injected and lifted after the
    // fixture is shared behind an Arc.
    failing: RwLock<HashSet<&'static str>>,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user: UserProfile) -> &mut Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn add_project(&mut self, project: ProjectSummary) -> &mut Self {
        self.projects.insert(project.id, project);
        self
    }

    pub fn add_low_stock(&mut self, project_id: ProjectId, material: MaterialStock) -> &mut Self {
        self.low_stock.entry(project_id).or_default().push(material);
        self
    }

    pub fn set_active_machinery(&mut self, project_id: ProjectId, count: i64) -> &mut Self {
        self.active_machinery.insert(project_id, count);
        self
    }

    pub fn set_open_incidents(&mut self, project_id: ProjectId, count: i64) -> &mut Self {
        self.open_incidents.insert(project_id, count);
        self
    }

    pub fn set_attendance_rate(&mut self, project_id: ProjectId, rate: f64) -> &mut Self {
        self.attendance.insert(project_id, rate);
        self
    }

    pub fn set_settings(&mut self, user_id: UserId, settings: UserSettings) -> &mut Self {
        self.settings.insert(user_id, settings);
        self
    }

    /// Make every query against the named context fail with
    /// [`ContextUnavailable`].
    pub fn fail_context(&self, context: &'static str) -> &Self {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context);
        self
    }

    /// Lift a failure injected with [`fail_context`](Self::fail_context).
    pub fn recover_context(&self, context: &'static str) -> &Self {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(context);
        self
    }

    fn check(&self, context: &'static str) -> ContextResult<()> {
        if self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(context)
        {
            return Err(ContextUnavailable::new(context, sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl UserFacade for InMemoryContext {
    async fn find_by_id(&self, id: UserId) -> ContextResult<Option<UserProfile>> {
        self.check("users")?;
        Ok(self.users.get(&id).cloned())
    }

    async fn find_active_by_role(&self, role: UserRole) -> ContextResult<Vec<UserProfile>> {
        self.check("users")?;
        Ok(self
            .users
            .values()
            .filter(|u| u.role == role && u.active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProjectFacade for InMemoryContext {
    async fn find_by_id(&self, id: ProjectId) -> ContextResult<Option<ProjectSummary>> {
        self.check("projects")?;
        Ok(self.projects.get(&id).cloned())
    }

    async fn find_active(&self) -> ContextResult<Vec<ProjectSummary>> {
        self.check("projects")?;
        Ok(self
            .projects
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MaterialFacade for InMemoryContext {
    async fn low_stock_for_project(
        &self,
        project_id: ProjectId,
    ) -> ContextResult<Vec<MaterialStock>> {
        self.check("materials")?;
        Ok(self.low_stock.get(&project_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl MachineryFacade for InMemoryContext {
    async fn active_count(&self, project_id: ProjectId) -> ContextResult<i64> {
        self.check("machinery")?;
        Ok(self.active_machinery.get(&project_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl IncidentFacade for InMemoryContext {
    async fn open_count(&self, project_id: ProjectId) -> ContextResult<i64> {
        self.check("incidents")?;
        Ok(self.open_incidents.get(&project_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl PersonnelFacade for InMemoryContext {
    async fn attendance_rate(&self, project_id: ProjectId) -> ContextResult<Option<f64>> {
        self.check("personnel")?;
        Ok(self.attendance.get(&project_id).copied())
    }
}

#[async_trait]
impl SettingsFacade for InMemoryContext {
    async fn settings_for(&self, user_id: UserId) -> ContextResult<UserSettings> {
        self.check("configuration")?;
        Ok(self.settings.get(&user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, active: bool) -> UserProfile {
        UserProfile {
            id: UserId::new(),
            name: "Maria Ramos".to_string(),
            email: "maria@example.com".to_string(),
            role,
            active,
        }
    }

    #[tokio::test]
    async fn test_role_query_excludes_inactive_users() {
        let mut ctx = InMemoryContext::new();
        let active = user(UserRole::Admin, true);
        ctx.add_user(active.clone());
        ctx.add_user(user(UserRole::Admin, false));
        ctx.add_user(user(UserRole::Manager, true));

        let admins = ctx.find_active_by_role(UserRole::Admin).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, active.id);
    }

    #[tokio::test]
    async fn test_absent_data_returns_safe_defaults() {
        let ctx = InMemoryContext::new();
        let project = ProjectId::new();
        assert_eq!(ctx.active_count(project).await.unwrap(), 0);
        assert_eq!(ctx.open_count(project).await.unwrap(), 0);
        assert!(ctx.attendance_rate(project).await.unwrap().is_none());
        assert!(ctx.settings_for(UserId::new()).await.unwrap().notifications_enabled);
    }

    #[tokio::test]
    async fn test_failed_context_reports_unavailable_until_recovered() {
        let ctx = InMemoryContext::new();
        ctx.fail_context("users");
        let err = UserFacade::find_by_id(&ctx, UserId::new()).await.unwrap_err();
        assert_eq!(err.context(), "users");
        assert!(ctx.find_active().await.is_ok());

        ctx.recover_context("users");
        assert!(UserFacade::find_by_id(&ctx, UserId::new()).await.is_ok());
    }
}
