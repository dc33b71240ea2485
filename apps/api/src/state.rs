use std::sync::Arc;

use crate::broadcast::BroadcastHub;
use crate::config::Config;
use crate::pipeline::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Analysis runs and resume parsing. Built in testing mode when `TESTING_MODE` is on.
    pub pipeline: Arc<Pipeline>,
    /// WebSocket observers of the progress bus.
    pub hub: BroadcastHub,
    pub config: Config,
}
