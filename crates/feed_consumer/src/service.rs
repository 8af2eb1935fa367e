use crate::codec::{EnvelopeCodec, TransportMetadata};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::flow::FlowKind;
use common::BrokerDelivery;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{error, Span};

/// One delivery on its way through the consume pipeline.
#[derive(Debug, Clone)]
pub struct FeedDelivery {
    pub flow: FlowKind,
    pub queue: String,
    pub delivery: BrokerDelivery,
}

impl FeedDelivery {
    pub fn new(flow: FlowKind, queue: impl Into<String>, delivery: BrokerDelivery) -> Self {
        Self {
            flow,
            queue: queue.into(),
            delivery,
        }
    }
}

/// Innermost service of the pipeline: envelope decode then dispatch.
///
/// Never returns `Err` for bad input; every delivery ends in a
/// [`DispatchOutcome`].
#[derive(Clone)]
pub struct DispatchService {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl Service<FeedDelivery> for DispatchService {
    type Response = DispatchOutcome;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<DispatchOutcome, anyhow::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FeedDelivery) -> Self::Future {
        let dispatcher = self.dispatcher.clone();

        Box::pin(async move {
            let FeedDelivery {
                flow,
                queue,
                delivery,
            } = req;

            let transport = TransportMetadata::from_delivery(&delivery);

            let mut envelope = match EnvelopeCodec::decode(&delivery.payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!(
                        flow = %flow,
                        queue = %queue,
                        payload_bytes = delivery.payload.len(),
                        error = %e,
                        "Failed to parse envelope, message dropped"
                    );
                    return Ok(DispatchOutcome::MalformedEnvelope);
                }
            };

            envelope
                .header
                .apply_delivery_timestamps(delivery.timestamp, &transport);
            Span::current().record("entity_key", envelope.entity_key());

            let transport = (!transport.is_empty()).then_some(transport);
            Ok(dispatcher.dispatch(flow, envelope, transport).await)
        })
    }
}
