use std::fmt;
use std::time::Duration;

/// Everything needed to open one AMQP connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub virtual_host: String,
    pub username: String,
    pub password: String,
    /// Requested heartbeat interval; zero disables heartbeats
    pub heartbeat: Duration,
    pub connection_timeout: Duration,
}

impl ConnectionSettings {
    /// Heartbeat in whole seconds, clamped to what the protocol can carry
    pub fn heartbeat_secs(&self) -> u16 {
        self.heartbeat.as_secs().min(u16::MAX as u64) as u16
    }

    /// Human readable target for log lines, never includes the password
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.virtual_host)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("virtual_host", &self.virtual_host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("heartbeat", &self.heartbeat)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}
