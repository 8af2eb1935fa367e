use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::dispatcher::DispatchOutcome;
use crate::service::FeedDelivery;
use tower::{Layer, Service};
use tracing::{debug, error, Instrument, Span};

/// Tower layer logging the outcome and duration of each feed delivery
#[derive(Clone, Default)]
pub struct FeedConsumeLoggingLayer;

impl FeedConsumeLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for FeedConsumeLoggingLayer {
    type Service = FeedConsumeLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        FeedConsumeLoggingService { inner: service }
    }
}

#[derive(Clone)]
pub struct FeedConsumeLoggingService<S> {
    inner: S,
}

impl<S> Service<FeedDelivery> for FeedConsumeLoggingService<S>
where
    S: Service<FeedDelivery, Response = DispatchOutcome> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: FeedDelivery) -> Self::Future {
        let flow = req.flow;
        let queue = req.queue.clone();
        let payload_size = req.delivery.payload.len();
        let start = Instant::now();
        let mut inner = self.inner.clone();

        let span = Span::current();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                let duration_ms = start.elapsed().as_millis();

                match &result {
                    Ok(outcome) => {
                        debug!(
                            flow = %flow,
                            queue = %queue,
                            payload_bytes = payload_size,
                            outcome = %outcome,
                            duration_ms = %duration_ms,
                            "consumed from {queue} in {duration_ms}ms [{outcome}]"
                        );
                    }
                    Err(e) => {
                        error!(
                            flow = %flow,
                            queue = %queue,
                            payload_bytes = payload_size,
                            duration_ms = %duration_ms,
                            error = %e,
                            "failed to consume from {queue} in {duration_ms}ms: {e}"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
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
    use tracing::Level;

    #[derive(Clone)]
    struct FixedOutcome(Result<DispatchOutcome, &'static str>);

    impl Service<FeedDelivery> for FixedOutcome {
        type Response = DispatchOutcome;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<DispatchOutcome, anyhow::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: FeedDelivery) -> Self::Future {
            let result = self.0.map_err(|e| anyhow::anyhow!(e));
            Box::pin(async move { result })
        }
    }

    fn request() -> FeedDelivery {
        FeedDelivery::new(FlowKind::PreMatch, "_9_", BrokerDelivery::new("{}"))
    }

    #[tokio::test]
    async fn test_logs_outcome_at_debug() {
        let (logs, _guard) = CapturedLogs::install();
        let service = FeedConsumeLoggingLayer::new()
            .layer(FixedOutcome(Ok(DispatchOutcome::NoHandler("MarketUpdate"))));

        let outcome = service.oneshot(request()).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::NoHandler("MarketUpdate"));
        let events = logs.at(Level::DEBUG);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field("outcome"), Some("no_handler"));
        assert_eq!(events[0].field("queue"), Some("_9_"));
    }

    #[tokio::test]
    async fn test_logs_service_error() {
        let (logs, _guard) = CapturedLogs::install();
        let service = FeedConsumeLoggingLayer::new().layer(FixedOutcome(Err("stack broke")));

        let result = service.oneshot(request()).await;

        assert!(result.is_err());
        let errors = logs.at(Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field("error"), Some("stack broke"));
    }
}
