use crate::codec::{Envelope, MessageHeader, TransportMetadata};
use crate::error::{FeedError, FeedResult};
use crate::flow::FlowKind;
use crate::registry::EntityDescriptor;
use async_trait::async_trait;
use feed_entities::FeedEntity;
use futures::future::BoxFuture;
use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Application callback for one entity kind.
///
/// Errors are logged by the dispatcher and never stop consumption.
#[async_trait]
pub trait EntityHandler<T: FeedEntity>: Send + Sync {
    async fn process(
        &self,
        header: &MessageHeader,
        transport: Option<&TransportMetadata>,
        entity: T,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<T, H> EntityHandler<T> for Arc<H>
where
    T: FeedEntity,
    H: EntityHandler<T> + ?Sized,
{
    async fn process(
        &self,
        header: &MessageHeader,
        transport: Option<&TransportMetadata>,
        entity: T,
    ) -> anyhow::Result<()> {
        (**self).process(header, transport, entity).await
    }
}

/// A handler with its entity type erased.
///
/// `prepare` decodes the body into the bound type and returns the pending
/// handler call, so a decode failure is distinguishable from a handler
/// failure.
pub trait BoundHandler: Send + Sync {
    fn entity_name(&self) -> &'static str;

    fn prepare<'a>(
        &'a self,
        envelope: &'a Envelope,
        transport: Option<&'a TransportMetadata>,
    ) -> Result<BoxFuture<'a, anyhow::Result<()>>, serde_json::Error>;
}

struct TypedBinding<T, H> {
    handler: H,
    _entity: PhantomData<fn() -> T>,
}

impl<T, H> BoundHandler for TypedBinding<T, H>
where
    T: FeedEntity,
    H: EntityHandler<T>,
{
    fn entity_name(&self) -> &'static str {
        T::NAME
    }

    fn prepare<'a>(
        &'a self,
        envelope: &'a Envelope,
        transport: Option<&'a TransportMetadata>,
    ) -> Result<BoxFuture<'a, anyhow::Result<()>>, serde_json::Error> {
        let entity: T = envelope.decode_body()?;
        Ok(self.handler.process(&envelope.header, transport, entity))
    }
}

/// Handler bindings keyed by flow and entity type.
///
/// At most one handler per (flow, entity type); the same handler value can
/// be bound in both flows by wrapping it in an `Arc`.
#[derive(Default)]
pub struct HandlerTable {
    bindings: HashMap<(FlowKind, TypeId), Box<dyn BoundHandler>>,
}

impl HandlerTable {
    pub fn builder() -> HandlerTableBuilder {
        HandlerTableBuilder::default()
    }

    pub fn lookup(&self, flow: FlowKind, entity: &EntityDescriptor) -> Option<&dyn BoundHandler> {
        self.bindings
            .get(&(flow, entity.type_id()))
            .map(|binding| binding.as_ref())
    }

    pub fn is_bound<T: FeedEntity>(&self, flow: FlowKind) -> bool {
        self.bindings.contains_key(&(flow, TypeId::of::<T>()))
    }

    /// Names of the entity types bound in a flow, sorted
    pub fn bound_types(&self, flow: FlowKind) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .bindings
            .iter()
            .filter(|((bound_flow, _), _)| *bound_flow == flow)
            .map(|(_, binding)| binding.entity_name())
            .collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (FlowKind, TypeId, &'static str)> + '_ {
        self.bindings
            .iter()
            .map(|((flow, type_id), binding)| (*flow, *type_id, binding.entity_name()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("inplay", &self.bound_types(FlowKind::InPlay))
            .field("prematch", &self.bound_types(FlowKind::PreMatch))
            .finish()
    }
}

#[derive(Default)]
pub struct HandlerTableBuilder {
    bindings: HashMap<(FlowKind, TypeId), Box<dyn BoundHandler>>,
}

impl HandlerTableBuilder {
    pub fn bind<T, H>(mut self, flow: FlowKind, handler: H) -> FeedResult<Self>
    where
        T: FeedEntity,
        H: EntityHandler<T> + 'static,
    {
        let key = (flow, TypeId::of::<T>());
        if self.bindings.contains_key(&key) {
            return Err(FeedError::DuplicateHandler {
                flow,
                entity: T::NAME,
            });
        }

        self.bindings.insert(
            key,
            Box::new(TypedBinding {
                handler,
                _entity: PhantomData,
            }),
        );
        Ok(self)
    }

    pub fn build(self) -> HandlerTable {
        HandlerTable {
            bindings: self.bindings,
        }
    }
}
