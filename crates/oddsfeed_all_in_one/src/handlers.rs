use async_trait::async_trait;
use feed_consumer::{
    EntityHandler, FeedResult, FlowKind, HandlerTableBuilder, MessageHeader, TransportMetadata,
};
use feed_entities::{
    FeedEntity, FixtureMetadataUpdate, HeartbeatUpdate, KeepAliveUpdate, LivescoreUpdate,
    MarketUpdate, OutrightFixtureMarketUpdate, OutrightFixtureUpdate, OutrightLeagueMarketUpdate,
    OutrightLeagueUpdate, OutrightScoreUpdate, OutrightSettlementsUpdate, SettlementUpdate,
};
use tracing::{debug, info};

/// Logs every message it receives; the default sink of the service
#[derive(Debug, Clone, Copy)]
pub struct LoggingHandler {
    flow: FlowKind,
}

impl LoggingHandler {
    pub fn new(flow: FlowKind) -> Self {
        Self { flow }
    }
}

#[async_trait]
impl<T: FeedEntity> EntityHandler<T> for LoggingHandler {
    async fn process(
        &self,
        header: &MessageHeader,
        transport: Option<&TransportMetadata>,
        entity: T,
    ) -> anyhow::Result<()> {
        info!(
            flow = %self.flow,
            entity = T::NAME,
            entity_key = header.entity_key,
            sequence = ?header.sequence,
            fixture_id = ?transport.and_then(|t| t.fixture_id),
            "received {}",
            T::NAME
        );
        debug!(entity = ?entity, "message body");
        Ok(())
    }
}

/// Bind a [`LoggingHandler`] for every entity kind in `flow`
pub fn bind_logging_handlers(
    builder: HandlerTableBuilder,
    flow: FlowKind,
) -> FeedResult<HandlerTableBuilder> {
    let handler = LoggingHandler::new(flow);
    builder
        .bind::<FixtureMetadataUpdate, _>(flow, handler)?
        .bind::<LivescoreUpdate, _>(flow, handler)?
        .bind::<MarketUpdate, _>(flow, handler)?
        .bind::<KeepAliveUpdate, _>(flow, handler)?
        .bind::<HeartbeatUpdate, _>(flow, handler)?
        .bind::<SettlementUpdate, _>(flow, handler)?
        .bind::<OutrightFixtureUpdate, _>(flow, handler)?
        .bind::<OutrightScoreUpdate, _>(flow, handler)?
        .bind::<OutrightFixtureMarketUpdate, _>(flow, handler)?
        .bind::<OutrightLeagueUpdate, _>(flow, handler)?
        .bind::<OutrightLeagueMarketUpdate, _>(flow, handler)?
        .bind::<OutrightSettlementsUpdate, _>(flow, handler)
}
