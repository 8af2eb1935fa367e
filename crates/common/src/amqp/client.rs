use crate::amqp::traits::{BrokerConnector, BrokerSession, DeliveryStream};
use crate::amqp::{BrokerDelivery, ConnectionSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicCancelOptions, BasicConsumeOptions, BasicQosOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::uri::{AMQPAuthority, AMQPQueryString, AMQPScheme, AMQPUri, AMQPUserInfo};
use lapin::{Channel, Connection, ConnectionProperties};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

const REPLY_SUCCESS: u16 = 200;

/// Concrete implementation of BrokerConnector using lapin
#[derive(Debug, Clone, Default)]
pub struct LapinConnector;

impl LapinConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrokerConnector for LapinConnector {
    #[instrument(skip_all, fields(endpoint = %settings.endpoint()))]
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn BrokerSession>> {
        info!(
            endpoint = %settings.endpoint(),
            heartbeat_secs = settings.heartbeat_secs(),
            timeout_ms = settings.connection_timeout.as_millis(),
            "Connecting to AMQP broker"
        );

        let connection = Connection::connect_uri(build_uri(settings), ConnectionProperties::default())
            .await
            .context("Failed to connect to AMQP broker")?;

        connection.on_error(|err| {
            warn!(error = %err, "AMQP connection error");
        });

        let channel = connection
            .create_channel()
            .await
            .context("Failed to open AMQP channel")?;

        info!("Successfully connected to AMQP broker");
        Ok(Box::new(LapinSession {
            connection,
            channel,
        }))
    }
}

/// Concrete implementation of BrokerSession using lapin
pub struct LapinSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BrokerSession for LapinSession {
    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        prefetch_count: u16,
    ) -> Result<DeliveryStream> {
        self.channel
            .basic_qos(prefetch_count, BasicQosOptions::default())
            .await
            .context("Failed to set prefetch count")?;

        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("Failed to start consuming from {}", queue))?;

        debug!(queue = %queue, consumer_tag = %consumer_tag, prefetch_count, "consumer subscribed");

        Ok(consumer
            .map(|item| {
                item.map(delivery_from_lapin)
                    .context("Failed to receive AMQP delivery")
            })
            .boxed())
    }

    async fn cancel(&self, consumer_tag: &str) -> Result<()> {
        self.channel
            .basic_cancel(consumer_tag, BasicCancelOptions::default())
            .await
            .context("Failed to cancel consumer")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Closing AMQP connection");
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "OK").await {
            // The connection close below tears the channel down anyway
            debug!(error = %e, "channel close failed");
        }
        self.connection
            .close(REPLY_SUCCESS, "OK")
            .await
            .context("Failed to close AMQP connection")?;
        Ok(())
    }
}

fn build_uri(settings: &ConnectionSettings) -> AMQPUri {
    AMQPUri {
        scheme: AMQPScheme::AMQP,
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: settings.username.clone(),
                password: settings.password.clone(),
            },
            host: settings.host.clone(),
            port: settings.port,
        },
        vhost: settings.virtual_host.clone(),
        query: AMQPQueryString {
            heartbeat: Some(settings.heartbeat_secs()),
            connection_timeout: Some(settings.connection_timeout.as_millis() as u64),
            ..Default::default()
        },
    }
}

fn delivery_from_lapin(delivery: Delivery) -> BrokerDelivery {
    let properties = &delivery.properties;
    let headers = properties
        .headers()
        .as_ref()
        .map(field_table_to_json)
        .unwrap_or_default();

    BrokerDelivery {
        kind: properties.kind().as_ref().map(|kind| kind.as_str().to_string()),
        timestamp: *properties.timestamp(),
        headers,
        payload: delivery.data.into(),
    }
}

fn field_table_to_json(table: &FieldTable) -> BTreeMap<String, Value> {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), amqp_value_to_json(value)))
        .collect()
}

fn amqp_value_to_json(value: &AMQPValue) -> Value {
    match value {
        AMQPValue::Boolean(b) => Value::Bool(*b),
        AMQPValue::ShortShortInt(n) => Value::from(*n),
        AMQPValue::ShortShortUInt(n) => Value::from(*n),
        AMQPValue::ShortInt(n) => Value::from(*n),
        AMQPValue::ShortUInt(n) => Value::from(*n),
        AMQPValue::LongInt(n) => Value::from(*n),
        AMQPValue::LongUInt(n) => Value::from(*n),
        AMQPValue::LongLongInt(n) => Value::from(*n),
        AMQPValue::Float(f) => Value::from(f64::from(*f)),
        AMQPValue::Double(f) => Value::from(*f),
        AMQPValue::Timestamp(t) => Value::from(*t),
        AMQPValue::ShortString(s) => Value::String(s.as_str().to_string()),
        AMQPValue::LongString(s) => Value::String(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        AMQPValue::FieldTable(table) => Value::Object(field_table_to_json(table).into_iter().collect()),
        _ => Value::Null,
    }
}
