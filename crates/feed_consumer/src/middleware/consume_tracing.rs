use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::service::FeedDelivery;
use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};

/// Tower layer opening one root span per feed delivery
#[derive(Clone, Default)]
pub struct FeedConsumeTracingLayer;

impl FeedConsumeTracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for FeedConsumeTracingLayer {
    type Service = FeedConsumeTracingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        FeedConsumeTracingService { inner: service }
    }
}

#[derive(Clone)]
pub struct FeedConsumeTracingService<S> {
    inner: S,
}

impl<S> Service<FeedDelivery> for FeedConsumeTracingService<S>
where
    S: Service<FeedDelivery> + Clone + Send + 'static,
    S::Error: Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: FeedDelivery) -> Self::Future {
        // Each delivery starts its own trace, not nested under the feed task
        let span = info_span!(
            parent: Span::none(),
            "feed_message",
            flow = %req.flow,
            queue = %req.queue,
            payload_bytes = req.delivery.payload.len(),
            message_type = field::Empty,
            entity_key = field::Empty,
        );
        if let Some(message_type) = req.delivery.header_str("MessageType") {
            span.record("message_type", message_type.as_str());
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await }.instrument(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowKind;
    use crate::testing::CapturedLogs;
    use common::BrokerDelivery;
    use futures::future::BoxFuture;
    use tower::ServiceExt;

    /// Reports the name of the span it runs in
    #[derive(Clone)]
    struct SpanProbe;

    impl Service<FeedDelivery> for SpanProbe {
        type Response = Option<&'static str>;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: FeedDelivery) -> Self::Future {
            Box::pin(async move { Ok(Span::current().metadata().map(|m| m.name())) })
        }
    }

    #[tokio::test]
    async fn test_inner_service_runs_in_feed_message_span() {
        let (_logs, _guard) = CapturedLogs::install();
        let service = FeedConsumeTracingLayer::new().layer(SpanProbe);
        let req = FeedDelivery::new(
            FlowKind::InPlay,
            "_5_",
            BrokerDelivery::new("{}").with_header("MessageType", "MarketUpdate"),
        );

        let span_name = service.oneshot(req).await.unwrap();

        assert_eq!(span_name, Some("feed_message"));
    }
}
