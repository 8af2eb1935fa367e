use config::{Config, ConfigError, Environment};
use feed_consumer::{Credentials, FeedConnectionConfig, FlowKind};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,

    // Broker configuration
    /// Broker host serving the in-play virtual host
    #[serde(default = "default_host")]
    pub inplay_host: String,

    /// Broker host serving the pre-match virtual host
    #[serde(default = "default_host")]
    pub prematch_host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    // Packages; a flow without a package id is not started
    #[serde(default)]
    pub inplay_package_id: Option<i32>,

    #[serde(default)]
    pub prematch_package_id: Option<i32>,

    // Consumption
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: u16,

    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Reconnect automatically when an established connection drops
    #[serde(default = "default_automatic_recovery")]
    pub automatic_recovery: bool,

    #[serde(default = "default_recovery_interval_secs")]
    pub recovery_interval_secs: u64,

    /// Per-handler time limit in milliseconds, 0 disables it
    #[serde(default)]
    pub handler_timeout_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5672
}

fn default_prefetch_count() -> u16 {
    100
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_connection_timeout_secs() -> u64 {
    10
}

fn default_automatic_recovery() -> bool {
    true
}

fn default_recovery_interval_secs() -> u64 {
    30
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("ODDSFEED"))
            .build()?
            .try_deserialize()
    }

    /// Flows that have a package id configured, with their package id
    pub fn enabled_flows(&self) -> Vec<(FlowKind, i32)> {
        FlowKind::ALL
            .into_iter()
            .filter_map(|flow| self.package_id(flow).map(|id| (flow, id)))
            .collect()
    }

    pub fn package_id(&self, flow: FlowKind) -> Option<i32> {
        match flow {
            FlowKind::InPlay => self.inplay_package_id,
            FlowKind::PreMatch => self.prematch_package_id,
        }
    }

    pub fn host(&self, flow: FlowKind) -> &str {
        match flow {
            FlowKind::InPlay => &self.inplay_host,
            FlowKind::PreMatch => &self.prematch_host,
        }
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_ms > 0).then(|| Duration::from_millis(self.handler_timeout_ms))
    }

    pub fn feed_config(&self, flow: FlowKind, package_id: i32) -> FeedConnectionConfig {
        FeedConnectionConfig::new(
            flow,
            self.host(flow),
            package_id,
            Credentials::new(&self.username, &self.password),
        )
        .with_port(self.port)
        .with_prefetch_count(self.prefetch_count)
        .with_heartbeat(Duration::from_secs(self.heartbeat_secs))
        .with_connection_timeout(Duration::from_secs(self.connection_timeout_secs))
        .with_recovery(
            self.automatic_recovery,
            Duration::from_secs(self.recovery_interval_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 9] = [
        "ODDSFEED_LOG_LEVEL",
        "ODDSFEED_INPLAY_HOST",
        "ODDSFEED_USERNAME",
        "ODDSFEED_PASSWORD",
        "ODDSFEED_INPLAY_PACKAGE_ID",
        "ODDSFEED_PREMATCH_PACKAGE_ID",
        "ODDSFEED_HANDLER_TIMEOUT_MS",
        "ODDSFEED_AUTOMATIC_RECOVERY",
        "ODDSFEED_CONNECT_AT_START",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: Test runs with mutex lock to prevent concurrent env access
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = ServiceConfig::from_env().unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, "json");
        assert_eq!(config.port, 5672);
        assert_eq!(config.prefetch_count, 100);
        assert!(config.automatic_recovery);
        assert!(config.handler_timeout().is_none());
        assert!(config.enabled_flows().is_empty());
    }

    #[test]
    fn test_connect_at_start_is_not_a_setting() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("ODDSFEED_CONNECT_AT_START", "true");
            std::env::set_var("ODDSFEED_PREMATCH_PACKAGE_ID", "77");
        }

        let config = ServiceConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.enabled_flows(), vec![(FlowKind::PreMatch, 77)]);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("ODDSFEED_LOG_LEVEL", "debug");
            std::env::set_var("ODDSFEED_INPLAY_HOST", "inplay.broker");
            std::env::set_var("ODDSFEED_USERNAME", "client@example.com");
            std::env::set_var("ODDSFEED_PASSWORD", "secret");
            std::env::set_var("ODDSFEED_INPLAY_PACKAGE_ID", "1234");
            std::env::set_var("ODDSFEED_HANDLER_TIMEOUT_MS", "250");
            std::env::set_var("ODDSFEED_AUTOMATIC_RECOVERY", "false");
        }

        let config = ServiceConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.enabled_flows(), vec![(FlowKind::InPlay, 1234)]);
        assert_eq!(config.handler_timeout(), Some(Duration::from_millis(250)));

        let feed = config.feed_config(FlowKind::InPlay, 1234);
        assert_eq!(feed.host, "inplay.broker");
        assert_eq!(feed.queue_name(), "_1234_");
        assert_eq!(feed.credentials.username, "client@example.com");
        assert!(!feed.automatic_recovery);
        assert!(feed.validate().is_ok());
    }
}
