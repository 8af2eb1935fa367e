pub mod amqp;
pub mod telemetry;

pub use amqp::*;
pub use telemetry::*;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use amqp::MockBrokerConnector;
#[cfg(any(test, feature = "testing"))]
pub use amqp::MockBrokerSession;
