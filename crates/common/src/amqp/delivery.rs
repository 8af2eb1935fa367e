use bytes::Bytes;
use serde_json::Value;
use std::collections::BTreeMap;

/// An owned broker delivery, detached from the client library.
///
/// Header values are normalised to JSON values so consumers do not depend on
/// the AMQP field-table types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokerDelivery {
    /// Raw message body
    pub payload: Bytes,
    /// The AMQP `type` property, when the publisher set one
    pub kind: Option<String>,
    /// The AMQP `timestamp` property (seconds since the epoch)
    pub timestamp: Option<u64>,
    /// Application headers
    pub headers: BTreeMap<String, Value>,
}

impl BrokerDelivery {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Header lookup ignoring ASCII case
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Header as text; numbers are rendered, empty strings count as absent
    pub fn header_str(&self, name: &str) -> Option<String> {
        match self.header(name)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Header as an integer; numeric strings are accepted
    pub fn header_i64(&self, name: &str) -> Option<i64> {
        match self.header(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
