//! Configuration parsing for the trade-companion sync engine.
//!
//! All components read their settings from a single JSON config file. The
//! top-level structure contains app metadata, the stream endpoint block, and
//! supervisor tuning knobs. Every tunable is optional — `effective_*()`
//! accessors supply the defaults so a minimal config is just the stream URL.
//!
//! # Example config
//!
//! ```json
//! {
//!   "app": { "module_name": "tc-sync", "log_path": "/tmp/log" },
//!   "stream": {
//!     "url": "https://api.example.com/v1/events/stream",
//!     "token_env": "TC_SESSION_TOKEN",
//!     "staleness_secs": 90
//!   },
//!   "supervisor": {
//!     "liveness_interval_secs": 30,
//!     "backoff_initial_ms": 500,
//!     "backoff_max_secs": 30,
//!     "max_connect_retries": 10
//!   }
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// App metadata (module name, log path).
    pub app: Option<AppMeta>,

    /// Event-stream endpoint configuration.
    pub stream: StreamConfig,

    /// Connection supervisor tuning.
    #[serde(default)]
    pub supervisor: SupervisorSettings,
}

impl AppConfig {
    /// Returns the module name used for log file prefixes.
    pub fn module_name(&self) -> String {
        self.app
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| "tc-sync".to_string())
    }

    /// Returns the log directory, if file logging is configured.
    pub fn log_path(&self) -> Option<String> {
        self.app.as_ref().and_then(|m| m.log_path.clone())
    }
}

/// App metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct AppMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// Event-stream endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Server-push endpoint URL (e.g. `https://api.example.com/v1/events/stream`).
    pub url: String,

    /// Environment variable holding the session bearer token.
    pub token_env: Option<String>,

    /// Staleness window: the connection counts as inactive if no frame has
    /// arrived within this many seconds.
    pub staleness_secs: Option<u64>,
}

impl StreamConfig {
    /// Returns the name of the env var holding the session token.
    pub fn effective_token_env(&self) -> String {
        self.token_env.clone().unwrap_or_else(|| "TC_SESSION_TOKEN".to_string())
    }

    /// Returns the effective staleness window (default: 90s).
    pub fn effective_staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs.unwrap_or(90))
    }
}

/// Connection supervisor tuning knobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupervisorSettings {
    /// Interval between liveness checks in seconds (default: 30).
    pub liveness_interval_secs: Option<u64>,

    /// Initial reconnect backoff in milliseconds (default: 500).
    pub backoff_initial_ms: Option<u64>,

    /// Backoff ceiling in seconds (default: 30).
    pub backoff_max_secs: Option<u64>,

    /// Maximum connect attempts per auth transition before the error is
    /// surfaced as persistent (default: 10).
    pub max_connect_retries: Option<u32>,
}

impl SupervisorSettings {
    pub fn effective_liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs.unwrap_or(30))
    }

    pub fn effective_backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms.unwrap_or(500))
    }

    pub fn effective_backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs.unwrap_or(30))
    }

    pub fn effective_max_retries(&self) -> u32 {
        self.max_connect_retries.unwrap_or(10)
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let json = r#"{ "stream": { "url": "https://api.example.com/events" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.module_name(), "tc-sync");
        assert_eq!(config.stream.effective_token_env(), "TC_SESSION_TOKEN");
        assert_eq!(config.stream.effective_staleness(), Duration::from_secs(90));
        assert_eq!(config.supervisor.effective_liveness_interval(), Duration::from_secs(30));
        assert_eq!(config.supervisor.effective_max_retries(), 10);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let json = r#"{
            "app": { "module_name": "companion", "log_path": "/var/log/tc" },
            "stream": { "url": "https://api.example.com/events", "staleness_secs": 15 },
            "supervisor": { "liveness_interval_secs": 5, "max_connect_retries": 3 }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.module_name(), "companion");
        assert_eq!(config.log_path().as_deref(), Some("/var/log/tc"));
        assert_eq!(config.stream.effective_staleness(), Duration::from_secs(15));
        assert_eq!(config.supervisor.effective_liveness_interval(), Duration::from_secs(5));
        assert_eq!(config.supervisor.effective_max_retries(), 3);
    }
}
