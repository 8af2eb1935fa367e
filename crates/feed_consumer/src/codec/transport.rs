use common::BrokerDelivery;

const MESSAGE_TYPE: &str = "MessageType";
const MESSAGE_SEQUENCE: &str = "MessageSequence";
const FIXTURE_ID: &str = "FixtureId";
const MESSAGE_GUID: &str = "MessageGuid";
const TIMESTAMP_IN_MS: &str = "timestamp_in_ms";

/// Delivery-level metadata set by the platform on the broker message.
///
/// Read from AMQP properties and headers only, never from the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMetadata {
    pub message_type: Option<String>,
    pub sequence: Option<i64>,
    pub fixture_id: Option<i64>,
    pub message_guid: Option<String>,
    pub timestamp_in_ms: Option<i64>,
}

impl TransportMetadata {
    pub fn from_delivery(delivery: &BrokerDelivery) -> Self {
        Self {
            message_type: delivery
                .header_str(MESSAGE_TYPE)
                .or_else(|| delivery.kind.clone().filter(|kind| !kind.is_empty())),
            sequence: delivery.header_i64(MESSAGE_SEQUENCE),
            fixture_id: delivery.header_i64(FIXTURE_ID),
            message_guid: delivery.header_str(MESSAGE_GUID),
            timestamp_in_ms: delivery.header_i64(TIMESTAMP_IN_MS),
        }
    }

    /// True when the delivery carried none of the transport fields
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_delivery_headers() {
        let delivery = BrokerDelivery::new("{}")
            .with_header("MessageType", "LivescoreUpdate")
            .with_header("MessageSequence", 88)
            .with_header("FixtureId", "13042334")
            .with_header("MessageGuid", "5f1c")
            .with_header("timestamp_in_ms", 1_714_557_600_123_i64);

        let transport = TransportMetadata::from_delivery(&delivery);

        assert_eq!(transport.message_type.as_deref(), Some("LivescoreUpdate"));
        assert_eq!(transport.sequence, Some(88));
        assert_eq!(transport.fixture_id, Some(13042334));
        assert_eq!(transport.message_guid.as_deref(), Some("5f1c"));
        assert_eq!(transport.timestamp_in_ms, Some(1_714_557_600_123));
        assert!(!transport.is_empty());
    }

    #[test]
    fn test_amqp_type_is_fallback_message_type() {
        let delivery = BrokerDelivery::new("{}").with_kind("MarketUpdate");
        let transport = TransportMetadata::from_delivery(&delivery);
        assert_eq!(transport.message_type.as_deref(), Some("MarketUpdate"));

        let delivery = BrokerDelivery::new("{}")
            .with_kind("MarketUpdate")
            .with_header("messagetype", "SettlementUpdate");
        let transport = TransportMetadata::from_delivery(&delivery);
        assert_eq!(transport.message_type.as_deref(), Some("SettlementUpdate"));
    }

    #[test]
    fn test_empty_delivery_has_no_metadata() {
        let transport = TransportMetadata::from_delivery(&BrokerDelivery::new("{}"));
        assert!(transport.is_empty());
    }
}
