//! Shared fixtures for the check tests.

use std::sync::Arc;

use sitepulse_core::config::RealtimeConfig;
use sitepulse_core::types::{ProjectId, UserId};
use sitepulse_database::memory::{
    InMemoryDeliveryStore, InMemoryNotificationStore, InMemoryPreferenceStore,
};
use sitepulse_engine::{
    DeliveryDispatcher, EmailChannel, EmailRenderer, MemoryEmailTransport,
    NotificationCommandService, TargetingResolver,
};
use sitepulse_entity::UserRole;
use sitepulse_facade::{InMemoryContext, ProjectSummary, UserProfile};
use sitepulse_realtime::RealtimeGateway;

pub(crate) struct EngineFixture {
    pub ctx: Arc<InMemoryContext>,
    pub service: Arc<NotificationCommandService>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub deliveries: Arc<InMemoryDeliveryStore>,
    pub transport: Arc<MemoryEmailTransport>,
    pub email: Arc<EmailChannel>,
}

pub(crate) fn engine_fixture(ctx: InMemoryContext) -> EngineFixture {
    let ctx = Arc::new(ctx);
    let notifications = Arc::new(InMemoryNotificationStore::new());
    let deliveries = Arc::new(InMemoryDeliveryStore::new());
    let preferences = Arc::new(InMemoryPreferenceStore::new());
    let transport = Arc::new(MemoryEmailTransport::new());
    let gateway = Arc::new(RealtimeGateway::new(RealtimeConfig::default()));

    let email = Arc::new(EmailChannel::new(
        ctx.clone(),
        ctx.clone(),
        ctx.clone(),
        EmailRenderer::new("https://sitepulse.example"),
        transport.clone(),
    ));
    let dispatcher = Arc::new(DeliveryDispatcher::new(
        deliveries.clone(),
        preferences,
        gateway.clone(),
        email.clone(),
    ));
    let resolver = Arc::new(TargetingResolver::new(
        ctx.clone(),
        ctx.clone(),
        ctx.clone(),
    ));
    let service = Arc::new(NotificationCommandService::new(
        notifications.clone(),
        ctx.clone(),
        resolver,
        dispatcher,
        gateway,
    ));

    EngineFixture {
        ctx,
        service,
        notifications,
        deliveries,
        transport,
        email,
    }
}

pub(crate) fn profile(role: UserRole) -> UserProfile {
    UserProfile {
        id: UserId::new(),
        name: "Rosa Medina".to_string(),
        email: "rosa@example.com".to_string(),
        role,
        active: true,
    }
}

pub(crate) fn project(manager_id: UserId, supervisor_id: Option<UserId>) -> ProjectSummary {
    ProjectSummary {
        id: ProjectId::new(),
        name: "North Tower".to_string(),
        manager_id,
        supervisor_id,
        active: true,
    }
}
