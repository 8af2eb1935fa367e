mod config;
mod handlers;

use common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use common::{BrokerConnector, LapinConnector};
use config::ServiceConfig;
use feed_consumer::{Dispatcher, EntityRegistry, FeedConnection, FlowKind, HandlerTable};
use handlers::bind_logging_handlers;
use oddsfeed_runner::Runner;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log_format = match config.log_format.parse::<LogFormat>() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Invalid log format: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: "oddsfeed".to_string(),
        log_level: config.log_level.clone(),
        log_format,
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    let flows = config.enabled_flows();
    if flows.is_empty() {
        error!("No package configured, set ODDSFEED_INPLAY_PACKAGE_ID and/or ODDSFEED_PREMATCH_PACKAGE_ID");
        std::process::exit(1);
    }

    info!(flows = ?flows, "Starting oddsfeed service");

    let dispatcher = match build_dispatcher(&config, &flows) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            error!("Failed to build dispatcher: {}", e);
            std::process::exit(1);
        }
    };

    let connector: Arc<dyn BrokerConnector> = Arc::new(LapinConnector::new());
    let mut runner = Runner::new();

    for (flow, package_id) in flows {
        let feed = FeedConnection::new(
            config.feed_config(flow, package_id),
            connector.clone(),
            dispatcher.clone(),
        );
        // Distribution is switched on out of band; no activator is wired here
        runner = runner.with_named_process(format!("{}-feed", flow), move |ctx| feed.run(false, ctx));
    }

    // Each feed closes its own broker connection inside `run`
    let outcome = runner.run().await;

    std::process::exit(outcome.exit_code());
}

fn build_dispatcher(
    config: &ServiceConfig,
    flows: &[(FlowKind, i32)],
) -> anyhow::Result<Dispatcher> {
    let registry = EntityRegistry::standard()?;

    let mut handlers = HandlerTable::builder();
    for (flow, _) in flows {
        handlers = bind_logging_handlers(handlers, *flow)?;
    }

    Ok(Dispatcher::new(registry, Arc::new(handlers.build()))?
        .with_handler_timeout(config.handler_timeout()))
}
