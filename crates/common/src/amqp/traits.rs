use crate::amqp::{BrokerDelivery, ConnectionSettings};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of deliveries for one consumer subscription.
///
/// An `Err` item or the end of the stream means the subscription is gone
/// (connection dropped, channel closed, consumer cancelled by the broker).
pub type DeliveryStream = BoxStream<'static, Result<BrokerDelivery>>;

/// Trait for opening broker connections
/// Abstracts connection establishment so feed lifecycles can be tested without a broker
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Open a connection and a channel on it
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn BrokerSession>>;
}

/// Trait for operations on an open connection/channel pair
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Apply the prefetch count and start an auto-ack subscription on a queue
    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        prefetch_count: u16,
    ) -> Result<DeliveryStream>;

    /// Cancel a consumer subscription
    async fn cancel(&self, consumer_tag: &str) -> Result<()>;

    /// Close the channel and the connection
    async fn close(&self) -> Result<()>;
}
