use crate::codec::case_insensitive::CaseInsensitive;
use crate::codec::transport::TransportMetadata;
use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::collections::HashMap;

const HEADER: &str = "Header";
const BODY: &str = "Body";

/// Routing header carried in every envelope.
///
/// Only `Type` is required. Field names on the wire match ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageHeader {
    /// Integer key identifying the body's entity type
    #[serde(rename = "Type")]
    pub entity_key: i32,

    #[serde(rename = "MsgSeq", default)]
    pub sequence: Option<i64>,

    #[serde(rename = "MsgGuid", default)]
    pub message_guid: Option<String>,

    #[serde(rename = "CreationDate", default)]
    pub creation_date: Option<String>,

    #[serde(rename = "ServerTimestamp", default)]
    pub server_timestamp: Option<i64>,

    /// AMQP `timestamp` property of the delivery
    #[serde(skip)]
    pub broker_timestamp: Option<DateTime<Utc>>,

    /// `timestamp_in_ms` transport header of the delivery
    #[serde(skip)]
    pub message_timestamp: Option<DateTime<Utc>>,
}

impl MessageHeader {
    pub fn new(entity_key: i32) -> Self {
        Self {
            entity_key,
            ..Default::default()
        }
    }

    /// Copy delivery-level timestamps onto the header
    pub fn apply_delivery_timestamps(
        &mut self,
        broker_secs: Option<u64>,
        transport: &TransportMetadata,
    ) {
        self.broker_timestamp = broker_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        self.message_timestamp = transport
            .timestamp_in_ms
            .and_then(DateTime::from_timestamp_millis);
    }
}

/// One decoded delivery: a parsed header and a still-raw body.
#[derive(Debug)]
pub struct Envelope {
    pub header: MessageHeader,
    body: Option<Box<RawValue>>,
}

impl Envelope {
    pub fn new(header: MessageHeader, body: Option<Box<RawValue>>) -> Self {
        Self { header, body }
    }

    pub fn entity_key(&self) -> i32 {
        self.header.entity_key
    }

    /// Raw body text, if the envelope carried a non-null body
    pub fn raw_body(&self) -> Option<&str> {
        self.body.as_deref().map(RawValue::get)
    }

    /// Decode the body into `T`, matching field names ignoring case.
    ///
    /// The body may be a JSON object or a string holding serialised JSON.
    /// A missing, `null` or blank body decodes as `{}`.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value = match self.raw_body() {
            Some(raw) => unwrap_string_body(serde_json::from_str(raw)?)?,
            None => empty_body(),
        };
        T::deserialize(CaseInsensitive::new(value))
    }
}

fn unwrap_string_body(value: Value) -> Result<Value, serde_json::Error> {
    match value {
        Value::Null => Ok(empty_body()),
        Value::String(text) if text.trim().is_empty() => Ok(empty_body()),
        Value::String(text) => match serde_json::from_str(&text)? {
            Value::Null => Ok(empty_body()),
            inner => Ok(inner),
        },
        other => Ok(other),
    }
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}

/// Parses raw delivery bytes into an [`Envelope`].
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    pub fn decode(raw: &[u8]) -> FeedResult<Envelope> {
        let members: HashMap<String, Box<RawValue>> = serde_json::from_slice(raw)
            .map_err(|e| FeedError::MalformedEnvelope(format!("not a JSON object: {}", e)))?;

        let mut header = None;
        let mut body = None;
        for (name, value) in members {
            if name.eq_ignore_ascii_case(HEADER) {
                header = Some(value);
            } else if name.eq_ignore_ascii_case(BODY) {
                body = Some(value);
            }
        }

        let header = header
            .ok_or_else(|| FeedError::MalformedEnvelope("missing Header".to_string()))?;
        let header = parse_header(&header)?;

        let body = body.filter(|raw| raw.get().trim() != "null");

        Ok(Envelope { header, body })
    }
}

fn parse_header(raw: &RawValue) -> FeedResult<MessageHeader> {
    let value: Value = serde_json::from_str(raw.get())
        .map_err(|e| FeedError::MalformedEnvelope(format!("unreadable Header: {}", e)))?;

    if !value.is_object() {
        return Err(FeedError::MalformedEnvelope(
            "Header is not an object".to_string(),
        ));
    }

    MessageHeader::deserialize(CaseInsensitive::new(value))
        .map_err(|e| FeedError::MalformedEnvelope(format!("invalid Header: {}", e)))
}
