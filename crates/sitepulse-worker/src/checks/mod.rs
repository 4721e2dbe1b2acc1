//! The engine checks run by the scheduler.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use sitepulse_core::AppResult;

pub mod attendance;
pub mod digest;
pub mod incidents;
pub mod machinery;
pub mod project_review;
pub mod retry;
pub mod stock;

pub use attendance::AttendanceCheck;
pub use digest::DigestCheck;
pub use incidents::IncidentBacklogCheck;
pub use machinery::MachineryCheck;
pub use project_review::ProjectReviewCheck;
pub use retry::RetryCheck;
pub use stock::StockCheck;

/// One scheduled unit of work.
#[async_trait]
pub trait EngineCheck: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the check should run this cycle. Checks with their own
    /// cadence (weekly, once per day) override this; the default runs
    /// every cycle.
    fn is_due(&self, _now: DateTime<Utc>) -> bool {
        true
    }

    async fn run(&self) -> AppResult<()>;
}

/// At-most-once-per-day latch for checks that must not repeat within a
/// calendar day even when the scheduler cycles more often.
#[derive(Debug, Default)]
pub struct DailyGate {
    // Days since the common era; 0 means never claimed.
    last_day: AtomicI64,
}

impl DailyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether today was already claimed.
    pub fn is_claimed(&self, now: DateTime<Utc>) -> bool {
        let day = i64::from(now.date_naive().num_days_from_ce());
        self.last_day.load(Ordering::Acquire) == day
    }

    /// Claim today. Returns false when today was already claimed.
    pub fn try_claim(&self, now: DateTime<Utc>) -> bool {
        let day = i64::from(now.date_naive().num_days_from_ce());
        let prev = self.last_day.load(Ordering::Acquire);
        if prev == day {
            return false;
        }
        self.last_day
            .compare_exchange(prev, day, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
