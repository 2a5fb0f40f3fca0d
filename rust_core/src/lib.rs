//! Relay Core - wire contract and aggregation state for the CDJ relay.
//!
//! This module provides:
//! - The one-frame-per-connection wire contract (Room and anti-cheat messages)
//! - Room Registry for lobby announcements
//! - Report Aggregator with the ban threshold policy
//! - Append-only ban log
//! - OneBot notifier client

pub mod aggregator;
pub mod ban_log;
pub mod clients;
pub mod models;
pub mod protocol;
pub mod registry;

pub use aggregator::{ReportAggregator, ReportOutcome};
pub use ban_log::BanLog;
pub use clients::{MessageTarget, Notifier, OneBotClient};
pub use models::{GameVersion, LangName, Room, SuspicionRecord, SuspicionReport};
pub use protocol::{Frame, ParseError};
pub use registry::RoomRegistry;
