//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::rendezvous::slot::DEFAULT_MAX_SLOT_KEY_LEN;

/// Root configuration for the broker.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BrokerConfig {
    /// Listener configuration (bind addresses, TLS).
    pub listener: ListenerConfig,

    /// Slot table limits.
    pub rendezvous: RendezvousConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator status endpoint.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Plain HTTP bind address (e.g., "0.0.0.0:8080").
    pub http_address: String,

    /// Optional HTTPS listener. Shares the slot table with the plain one.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// HTTPS bind address.
    #[serde(default = "default_https_address")]
    pub bind_address: String,

    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

fn default_https_address() -> String {
    "0.0.0.0:8443".to_string()
}

/// Rendezvous limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RendezvousConfig {
    /// Maximum slot key length in bytes.
    pub max_slot_key_len: usize,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Give up on an unanswered offer after this many seconds.
    /// Unset means wait until the client disconnects.
    pub idle_timeout_secs: Option<u64>,
}

impl RendezvousConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            max_slot_key_len: DEFAULT_MAX_SLOT_KEY_LEN,
            max_body_bytes: 64 * 1024,
            idle_timeout_secs: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin endpoint.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin endpoint bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
