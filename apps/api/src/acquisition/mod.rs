//! Job acquisition: site adapters, the adapter registry and the engine that
//! drives them across every {site × title} pair.

pub mod adapter;
pub mod engine;
pub mod fetch;
pub mod html;
pub mod registry;
pub mod sites;

pub use engine::{AcquisitionEngine, AcquisitionRequest};
pub use fetch::HttpFetcher;
pub use registry::AdapterRegistry;
