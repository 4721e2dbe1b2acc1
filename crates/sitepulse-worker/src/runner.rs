//! Cancellable periodic runner.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use sitepulse_core::config::EngineConfig;

use crate::checks::EngineCheck;

/// Runs every registered [`EngineCheck`] on a fixed interval after a
/// warm-up delay.
///
/// Each check is individually isolated: a failing check is logged and the
/// cycle continues with the remaining checks. The runner observes its
/// cancellation signal at every sleep boundary so shutdown is prompt.
pub struct EngineRunner {
    config: EngineConfig,
    checks: Vec<Arc<dyn EngineCheck>>,
    cancel: watch::Receiver<bool>,
}

impl EngineRunner {
    pub fn new(
        config: EngineConfig,
        checks: Vec<Arc<dyn EngineCheck>>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            checks,
            cancel,
        }
    }

    /// Run until cancelled.
    pub async fn run(mut self) {
        if !self.config.enabled {
            info!("engine scheduler disabled by configuration");
            return;
        }

        info!(
            warmup_seconds = self.config.warmup_seconds,
            interval_seconds = self.config.interval_seconds,
            checks = self.checks.len(),
            "engine scheduler starting"
        );
        if self
            .sleep_or_cancel(Duration::from_secs(self.config.warmup_seconds))
            .await
        {
            return;
        }

        loop {
            self.run_cycle().await;
            if self
                .sleep_or_cancel(Duration::from_secs(self.config.interval_seconds))
                .await
            {
                break;
            }
        }
        info!("engine scheduler stopped");
    }

    /// One pass over all checks.
    pub async fn run_cycle(&self) {
        let now = Utc::now();
        for check in &self.checks {
            if !check.is_due(now) {
                debug!(check = check.name(), "check not due, skipped");
                continue;
            }
            match check.run().await {
                Ok(()) => debug!(check = check.name(), "check finished"),
                Err(err) => {
                    // One failing check never stops the cycle.
                    error!(check = check.name(), error = %err, "check failed");
                }
            }
        }
    }

    /// Returns true when cancelled.
    async fn sleep_or_cancel(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            changed = self.cancel.changed() => match changed {
                Ok(()) => *self.cancel.borrow(),
                // Sender dropped: treat as shutdown.
                Err(_) => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use sitepulse_core::{AppError, AppResult};

    #[derive(Default)]
    struct CountingCheck {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl EngineCheck for CountingCheck {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self) -> AppResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingCheck;

    #[async_trait]
    impl EngineCheck for FailingCheck {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn run(&self) -> AppResult<()> {
            Err(AppError::internal("boom"))
        }
    }

    struct NeverDueCheck {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl EngineCheck for NeverDueCheck {
        fn name(&self) -> &'static str {
            "never_due"
        }

        fn is_due(&self, _now: DateTime<Utc>) -> bool {
            false
        }

        async fn run(&self) -> AppResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(warmup: u64, interval: u64) -> EngineConfig {
        EngineConfig {
            warmup_seconds: warmup,
            interval_seconds: interval,
            ..EngineConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_check_does_not_stop_the_cycle() {
        let counting = Arc::new(CountingCheck::default());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let checks: Vec<Arc<dyn EngineCheck>> = vec![Arc::new(FailingCheck), counting.clone()];
        let runner = EngineRunner::new(config(0, 60), checks, cancel_rx);
        let handle = tokio::spawn(runner.run());

        tokio::time::sleep(Duration::from_secs(125)).await;
        cancel_tx.send(true).unwrap();
        handle.await.unwrap();

        // Warm-up cycle plus two interval cycles fit in 125 virtual seconds.
        assert!(counting.runs.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undue_checks_are_skipped() {
        let never = Arc::new(NeverDueCheck {
            runs: AtomicUsize::new(0),
        });
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let checks: Vec<Arc<dyn EngineCheck>> = vec![never.clone()];
        let runner = EngineRunner::new(config(0, 60), checks, cancel_rx);
        let handle = tokio::spawn(runner.run());

        tokio::time::sleep(Duration::from_secs(61)).await;
        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(never.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_warmup_runs_nothing() {
        let counting = Arc::new(CountingCheck::default());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let checks: Vec<Arc<dyn EngineCheck>> = vec![counting.clone()];
        let runner = EngineRunner::new(config(300, 60), checks, cancel_rx);
        let handle = tokio::spawn(runner.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(counting.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_returns_immediately() {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let runner = EngineRunner::new(
            EngineConfig {
                enabled: false,
                ..EngineConfig::default()
            },
            vec![],
            cancel_rx,
        );
        runner.run().await;
    }
}
