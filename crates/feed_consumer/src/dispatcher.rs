use crate::codec::{Envelope, TransportMetadata};
use crate::error::{FeedError, FeedResult};
use crate::flow::FlowKind;
use crate::handlers::HandlerTable;
use crate::registry::EntityRegistry;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// What happened to one delivery. Informational only; dispatch never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    MalformedEnvelope,
    UnknownEntityKey(i32),
    NoHandler(&'static str),
    BodyRejected(&'static str),
    HandlerFailed(&'static str),
    HandlerTimedOut(&'static str),
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Handled => "handled",
            DispatchOutcome::MalformedEnvelope => "malformed_envelope",
            DispatchOutcome::UnknownEntityKey(_) => "unknown_entity_key",
            DispatchOutcome::NoHandler(_) => "no_handler",
            DispatchOutcome::BodyRejected(_) => "body_rejected",
            DispatchOutcome::HandlerFailed(_) => "handler_failed",
            DispatchOutcome::HandlerTimedOut(_) => "handler_timed_out",
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled)
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes decoded envelopes to the handler bound for their flow and type.
pub struct Dispatcher {
    registry: Arc<EntityRegistry>,
    handlers: Arc<HandlerTable>,
    handler_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Fails when a handler is bound for a type the registry does not know
    pub fn new(registry: Arc<EntityRegistry>, handlers: Arc<HandlerTable>) -> FeedResult<Self> {
        for (_, type_id, name) in handlers.entries() {
            if !registry.contains_type(type_id) {
                return Err(FeedError::UnregisteredEntityType(name));
            }
        }

        Ok(Self {
            registry,
            handlers,
            handler_timeout: None,
        })
    }

    /// Bound each handler call; an expired call is dropped and logged
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout.filter(|d| !d.is_zero());
        self
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    pub fn handlers(&self) -> &Arc<HandlerTable> {
        &self.handlers
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout
    }

    pub async fn dispatch(
        &self,
        flow: FlowKind,
        envelope: Envelope,
        transport: Option<TransportMetadata>,
    ) -> DispatchOutcome {
        let key = envelope.entity_key();

        let Some(descriptor) = self.registry.resolve(key) else {
            warn!(entity_key = key, flow = %flow, "Unknown entity key {}, message dropped", key);
            return DispatchOutcome::UnknownEntityKey(key);
        };
        let entity = descriptor.name();

        let Some(handler) = self.handlers.lookup(flow, descriptor) else {
            warn!(
                entity_key = key,
                entity,
                flow = %flow,
                "No handler bound for {} in {} flow, message dropped",
                entity,
                flow
            );
            return DispatchOutcome::NoHandler(entity);
        };

        let invocation = match handler.prepare(&envelope, transport.as_ref()) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(
                    entity_key = key,
                    entity,
                    flow = %flow,
                    error = %e,
                    "Failed to decode {} body, message dropped",
                    entity
                );
                return DispatchOutcome::BodyRejected(entity);
            }
        };

        self.invoke(flow, entity, invocation).await
    }

    async fn invoke(
        &self,
        flow: FlowKind,
        entity: &'static str,
        invocation: BoxFuture<'_, anyhow::Result<()>>,
    ) -> DispatchOutcome {
        let guarded = AssertUnwindSafe(invocation).catch_unwind();

        let result = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        entity,
                        flow = %flow,
                        timeout_ms = limit.as_millis() as u64,
                        "Handler for {} timed out",
                        entity
                    );
                    return DispatchOutcome::HandlerTimedOut(entity);
                }
            },
            None => guarded.await,
        };

        match result {
            Ok(Ok(())) => {
                debug!(entity, flow = %flow, "handler completed");
                DispatchOutcome::Handled
            }
            Ok(Err(e)) => {
                error!(entity, flow = %flow, error = %e, "Handler for {} failed", entity);
                DispatchOutcome::HandlerFailed(entity)
            }
            Err(panic) => {
                error!(
                    entity,
                    flow = %flow,
                    panic = %panic_message(panic.as_ref()),
                    "Handler for {} panicked",
                    entity
                );
                DispatchOutcome::HandlerFailed(entity)
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("entities", &self.registry.len())
            .field("handlers", &self.handlers)
            .field("handler_timeout", &self.handler_timeout)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
