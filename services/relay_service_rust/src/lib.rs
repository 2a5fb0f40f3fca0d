//! Relay Service Library
//!
//! Exposes the listeners, handlers and configuration for the binary and for
//! integration tests.

pub mod config;
pub mod error;
pub mod handlers;
pub mod listener;

// Re-export commonly used types
pub use config::RelayConfig;
pub use error::RelayError;
pub use handlers::{AntiCheatHandler, RoomHandler};
pub use listener::{ConnectionPolicy, FrameHandler, IngestionListener, ListenerOptions, ListenerState};
