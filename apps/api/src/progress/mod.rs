//! Progress Bus: process-wide publish point for pipeline stage events.
//!
//! Publishers never block: every subscriber owns a bounded queue and is
//! disconnected when it falls behind.

pub mod bus;
pub mod event;

pub use bus::{BusSubscription, ProgressBus};
pub use event::{ProgressEvent, ProgressStage};
