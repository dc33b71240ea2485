mod acquisition;
mod broadcast;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod pipeline;
mod progress;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::acquisition::registry::load_template_sources;
use crate::acquisition::{AcquisitionEngine, AdapterRegistry, HttpFetcher};
use crate::broadcast::{spawn_relay, BroadcastHub};
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::{LlmCapabilities, Pipeline, PipelineMode};
use crate::progress::ProgressBus;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    // Site adapters: enabled built-ins, then any configured template sources
    let templates = match &config.sources_file {
        Some(path) => load_template_sources(path)?,
        None => Vec::new(),
    };
    let registry = AdapterRegistry::from_sources(&config.enabled_sources, templates)
        .context("Invalid source configuration")?;
    if registry.is_empty() {
        warn!("No job sources enabled; every analysis will find no postings");
    }

    let fetcher = HttpFetcher::new(config.scrape_timeout).context("Failed to build HTTP client")?;

    // Progress bus and the WebSocket relay hanging off it
    let bus = ProgressBus::new(config.bus_subscriber_capacity);
    let hub = BroadcastHub::new(config.broadcast_queue_capacity, config.broadcast_send_timeout);
    spawn_relay(bus.clone(), hub.registry.clone());

    let engine = AcquisitionEngine::new(Arc::new(registry), Arc::new(fetcher), bus.clone());

    let mode = match (&config.anthropic_api_key, config.testing_mode) {
        (_, true) => {
            warn!("TESTING_MODE is on: serving sample matches and a sample parsed resume, no LLM or site calls");
            PipelineMode::Testing
        }
        (Some(key), false) => {
            let llm = LlmClient::new(key.clone()).context("Failed to build LLM client")?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            let capabilities = Arc::new(LlmCapabilities::new(llm));
            PipelineMode::Live {
                titles: capabilities.clone(),
                scorer: capabilities.clone(),
                parser: capabilities,
            }
        }
        (None, false) => anyhow::bail!("ANTHROPIC_API_KEY is required unless TESTING_MODE is on"),
    };

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(mode, engine, bus)),
        hub,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
