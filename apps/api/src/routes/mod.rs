pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::broadcast::ws_handler;
use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .route(
            "/api/v1/upload",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Resume parsing API
        .route(
            "/api/v1/resume/parse",
            post(handlers::handle_parse_resume).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/resume/parse-text",
            post(handlers::handle_parse_resume_text),
        )
        // Progress stream
        .route("/ws/progress", get(ws_handler))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::acquisition::engine::testing::StaticFetcher;
    use crate::acquisition::{AcquisitionEngine, AdapterRegistry};
    use crate::broadcast::BroadcastHub;
    use crate::config::Config;
    use crate::pipeline::{Pipeline, PipelineMode};
    use crate::progress::ProgressBus;
    use crate::state::AppState;

    pub fn config() -> Config {
        Config {
            testing_mode: true,
            anthropic_api_key: None,
            enabled_sources: vec![],
            sources_file: None::<PathBuf>,
            scrape_timeout: Duration::from_secs(1),
            bus_subscriber_capacity: 16,
            broadcast_queue_capacity: 8,
            broadcast_send_timeout: Duration::from_millis(100),
            max_upload_bytes: 1024,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    /// App state around `mode` with no job sources, plus the bus its pipeline publishes to.
    pub fn state_with_bus(mode: PipelineMode) -> (AppState, ProgressBus) {
        let bus = ProgressBus::new(16);
        let engine = AcquisitionEngine::new(
            Arc::new(AdapterRegistry::new()),
            Arc::new(StaticFetcher::default()),
            bus.clone(),
        );
        let testing_mode = matches!(mode, PipelineMode::Testing);
        let state = AppState {
            pipeline: Arc::new(Pipeline::new(mode, engine, bus.clone())),
            hub: BroadcastHub::new(8, Duration::from_millis(100)),
            config: Config {
                testing_mode,
                ..config()
            },
        };
        (state, bus)
    }
}
