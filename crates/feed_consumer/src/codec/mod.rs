mod case_insensitive;
mod envelope;
mod transport;

pub use case_insensitive::CaseInsensitive;
pub use envelope::{Envelope, EnvelopeCodec, MessageHeader};
pub use transport::TransportMetadata;
