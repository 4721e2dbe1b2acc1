//! Delivery retry pass.

use std::sync::Arc;

use async_trait::async_trait;

use sitepulse_core::AppResult;
use sitepulse_engine::RetryManager;

use super::EngineCheck;

/// Runs one retry pass over failed deliveries each engine cycle. The
/// manager logs its own per-pass summary.
pub struct RetryCheck {
    manager: Arc<RetryManager>,
}

impl RetryCheck {
    pub fn new(manager: Arc<RetryManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EngineCheck for RetryCheck {
    fn name(&self) -> &'static str {
        "retry_pass"
    }

    async fn run(&self) -> AppResult<()> {
        self.manager.retry_failed_deliveries().await.map(|_| ())
    }
}
