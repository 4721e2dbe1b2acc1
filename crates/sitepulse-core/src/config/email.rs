//! Email transport configuration.

use serde::{Deserialize, Serialize};

/// SMTP email transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Whether email delivery is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default = "default_host")]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_port")]
    pub smtp_port: u16,
    /// SMTP username (optional, unauthenticated relays skip it).
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address.
    #[serde(default = "default_from_address")]
    pub from_address: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Base URL of the web frontend, used for action links in templates.
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_host: default_host(),
            smtp_port: default_port(),
            username: None,
            password: None,
            from_address: default_from_address(),
            from_name: default_from_name(),
            site_url: default_site_url(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "notifications@sitepulse.local".to_string()
}

fn default_from_name() -> String {
    "SitePulse".to_string()
}

fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}
