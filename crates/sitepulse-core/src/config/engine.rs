//! Notification engine configuration: scheduler cadence, retry bounds,
//! health-check thresholds, and digest settings.

use serde::{Deserialize, Serialize};

/// Background scheduler and delivery engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether the background scheduler is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between scheduler cycles.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Warm-up delay in seconds before the first cycle.
    #[serde(default = "default_warmup")]
    pub warmup_seconds: u64,
    /// Maximum delivery attempts per channel before a delivery is left
    /// permanently failed.
    #[serde(default = "default_max_attempts")]
    pub max_delivery_attempts: u32,
    /// Days after which read notifications are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Daily digest settings.
    #[serde(default)]
    pub digest: DigestConfig,
    /// Health-check thresholds.
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

/// Daily digest email settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Hour of day (0-23, in the user's timezone) after which the digest
    /// pass becomes due.
    #[serde(default = "default_digest_hour")]
    pub hour: u32,
    /// Maximum number of items listed in a digest email.
    #[serde(default = "default_digest_max_items")]
    pub max_items: usize,
}

/// Thresholds for the proactive health-check sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Stock at or below this fraction of the minimum is critical.
    #[serde(default = "default_critical_stock_ratio")]
    pub critical_stock_ratio: f64,
    /// Projects with fewer active machinery units than this are flagged.
    #[serde(default = "default_min_active_machinery")]
    pub min_active_machinery: i64,
    /// Projects with more open incidents than this are flagged.
    #[serde(default = "default_max_open_incidents")]
    pub max_open_incidents: i64,
    /// Projects with an attendance rate below this fraction are flagged.
    #[serde(default = "default_min_attendance_rate")]
    pub min_attendance_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_interval(),
            warmup_seconds: default_warmup(),
            max_delivery_attempts: default_max_attempts(),
            retention_days: default_retention_days(),
            digest: DigestConfig::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            hour: default_digest_hour(),
            max_items: default_digest_max_items(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            critical_stock_ratio: default_critical_stock_ratio(),
            min_active_machinery: default_min_active_machinery(),
            max_open_incidents: default_max_open_incidents(),
            min_attendance_rate: default_min_attendance_rate(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    3600
}

fn default_warmup() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retention_days() -> i64 {
    90
}

fn default_digest_hour() -> u32 {
    7
}

fn default_digest_max_items() -> usize {
    10
}

fn default_critical_stock_ratio() -> f64 {
    0.5
}

fn default_min_active_machinery() -> i64 {
    2
}

fn default_max_open_incidents() -> i64 {
    5
}

fn default_min_attendance_rate() -> f64 {
    0.8
}
