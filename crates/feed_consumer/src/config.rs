use crate::error::{FeedError, FeedResult};
use crate::flow::FlowKind;
use common::ConnectionSettings;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5672;
pub const DEFAULT_PREFETCH_COUNT: u16 = 100;
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECOVERY_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection parameters for one feed (one flow, one package).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConnectionConfig {
    pub flow: FlowKind,
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub package_id: i32,
    pub prefetch_count: u16,
    pub heartbeat: Duration,
    pub recovery_interval: Duration,
    pub automatic_recovery: bool,
    pub connection_timeout: Duration,
    pub consumer_tag: String,
}

impl FeedConnectionConfig {
    pub fn new(
        flow: FlowKind,
        host: impl Into<String>,
        package_id: i32,
        credentials: Credentials,
    ) -> Self {
        Self {
            flow,
            host: host.into(),
            port: DEFAULT_PORT,
            credentials,
            package_id,
            prefetch_count: DEFAULT_PREFETCH_COUNT,
            heartbeat: DEFAULT_HEARTBEAT,
            recovery_interval: DEFAULT_RECOVERY_INTERVAL,
            automatic_recovery: true,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            consumer_tag: format!("oddsfeed-{}-{}", flow, package_id),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_prefetch_count(mut self, prefetch_count: u16) -> Self {
        self.prefetch_count = prefetch_count;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_recovery(mut self, automatic_recovery: bool, interval: Duration) -> Self {
        self.automatic_recovery = automatic_recovery;
        self.recovery_interval = interval;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_consumer_tag(mut self, consumer_tag: impl Into<String>) -> Self {
        self.consumer_tag = consumer_tag.into();
        self
    }

    pub fn virtual_host(&self) -> &'static str {
        self.flow.virtual_host()
    }

    /// The platform's per-package queue, `_{package_id}_`
    pub fn queue_name(&self) -> String {
        format!("_{}_", self.package_id)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            host: self.host.clone(),
            port: self.port,
            virtual_host: self.virtual_host().to_string(),
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
            heartbeat: self.heartbeat,
            connection_timeout: self.connection_timeout,
        }
    }

    pub fn validate(&self) -> FeedResult<()> {
        if self.host.trim().is_empty() {
            return Err(FeedError::InvalidConfig("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(FeedError::InvalidConfig("port must not be 0".to_string()));
        }
        if self.package_id <= 0 {
            return Err(FeedError::InvalidConfig(format!(
                "package id must be positive, got {}",
                self.package_id
            )));
        }
        if self.credentials.username.is_empty() {
            return Err(FeedError::InvalidConfig(
                "username must not be empty".to_string(),
            ));
        }
        if self.prefetch_count == 0 {
            return Err(FeedError::InvalidConfig(
                "prefetch count must be at least 1".to_string(),
            ));
        }
        if self.consumer_tag.is_empty() {
            return Err(FeedError::InvalidConfig(
                "consumer tag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FeedConnectionConfig {
        FeedConnectionConfig::new(
            FlowKind::InPlay,
            "stm.example.com",
            431,
            Credentials::new("user@example.com", "hunter2"),
        )
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.port, 5672);
        assert_eq!(config.prefetch_count, 100);
        assert_eq!(config.heartbeat, Duration::from_secs(30));
        assert_eq!(config.recovery_interval, Duration::from_secs(30));
        assert!(config.automatic_recovery);
        assert_eq!(config.consumer_tag, "oddsfeed-inplay-431");
    }

    #[test]
    fn test_derived_names() {
        let config = config();
        assert_eq!(config.virtual_host(), "StmInPlay");
        assert_eq!(config.queue_name(), "_431_");

        let settings = config.connection_settings();
        assert_eq!(settings.virtual_host, "StmInPlay");
        assert_eq!(settings.username, "user@example.com");
        assert_eq!(settings.password, "hunter2");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let cases = [
            FeedConnectionConfig {
                host: " ".to_string(),
                ..config()
            },
            FeedConnectionConfig {
                package_id: 0,
                ..config()
            },
            config().with_prefetch_count(0),
            config().with_port(0),
            config().with_consumer_tag(""),
            FeedConnectionConfig {
                credentials: Credentials::new("", "x"),
                ..config()
            },
        ];

        for case in cases {
            assert!(
                matches!(case.validate(), Err(FeedError::InvalidConfig(_))),
                "accepted {:?}",
                case
            );
        }
    }
}
