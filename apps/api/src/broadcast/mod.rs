//! Broadcast Server: relays progress bus events to WebSocket observers,
//! filtered per connection by request id.

pub mod protocol;
pub mod registry;
pub mod server;

pub use server::{spawn_relay, ws_handler, BroadcastHub};
