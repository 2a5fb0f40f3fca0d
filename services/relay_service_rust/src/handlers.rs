//! Frame handlers for the Room and anti-cheat listeners

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use relay_core::{
    BanLog, Notifier, ParseError, ReportAggregator, ReportOutcome, Room, RoomRegistry,
    SuspicionRecord,
};
use std::sync::Arc;
use std::time::Duration;

use crate::listener::FrameHandler;

// ============================================================================
// Room announcements
// ============================================================================

/// Registers every Room announcement and forwards its summary to the bot.
pub struct RoomHandler {
    registry: RoomRegistry,
    notifier: Arc<dyn Notifier>,
}

impl RoomHandler {
    pub fn new(registry: RoomRegistry, notifier: Arc<dyn Notifier>) -> Self {
        Self { registry, notifier }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub async fn process(&mut self, text: &str) -> Result<Room, ParseError> {
        let room = self.registry.submit(text)?;
        info!(
            "Room {} registered (players={} lang={} total={})",
            room.code,
            room.count,
            room.lang_id,
            self.registry.len()
        );

        let summary = self.registry.format(&room);
        if let Err(e) = self.notifier.notify(&summary).await {
            error!("Failed to send room notification for {}: {:#}", room.code, e);
        }
        Ok(room)
    }
}

#[async_trait]
impl FrameHandler for RoomHandler {
    async fn handle(&mut self, text: &str) {
        if let Err(e) = self.process(text).await {
            info!("Room message discarded: {}", e);
        }
    }
}

// ============================================================================
// Anti-cheat reports
// ============================================================================

/// Aggregates anti-cheat reports; on a ban transition persists a ban line and
/// alerts operators.
pub struct AntiCheatHandler {
    aggregator: ReportAggregator,
    ban_threshold: u32,
    ban_log: Option<BanLog>,
    notifier: Arc<dyn Notifier>,
    idle_ttl: Option<chrono::Duration>,
}

impl AntiCheatHandler {
    pub fn new(ban_threshold: u32, ban_log: Option<BanLog>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            aggregator: ReportAggregator::new(),
            ban_threshold,
            ban_log,
            notifier,
            idle_ttl: None,
        }
    }

    /// Prune idle, non-banned records before each report.
    pub fn with_idle_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.idle_ttl = ttl.and_then(|t| chrono::Duration::from_std(t).ok());
        self
    }

    pub fn aggregator(&self) -> &ReportAggregator {
        &self.aggregator
    }

    pub async fn process(&mut self, text: &str) -> ReportOutcome {
        if let Some(ttl) = self.idle_ttl {
            let pruned = self.aggregator.prune_idle(ttl, Utc::now());
            if pruned > 0 {
                debug!("Pruned {} idle suspicion records", pruned);
            }
        }

        let outcome = self.aggregator.submit(text, self.ban_threshold);
        match &outcome {
            ReportOutcome::Discarded(e) => info!("Anti-cheat message discarded: {}", e),
            ReportOutcome::Recorded { report_count } => {
                debug!("Anti-cheat report recorded (count={})", report_count)
            }
            ReportOutcome::Banned(record) => self.ban(record).await,
        }
        outcome
    }

    async fn ban(&mut self, record: &SuspicionRecord) {
        warn!(
            "Banning friend code {} after {} reports (threshold {})",
            record.friend_code, record.report_count, self.ban_threshold
        );

        match self.ban_log.as_mut() {
            Some(log) => {
                if let Err(e) = log.append(record).await {
                    error!("Failed to persist ban for {}: {:#}", record.friend_code, e);
                }
            }
            None => error!(
                "No ban log available, ban for {} not persisted",
                record.friend_code
            ),
        }

        if let Err(e) = self.notifier.notify(&record.ban_alert()).await {
            error!("Failed to send ban alert for {}: {:#}", record.friend_code, e);
        }
    }
}

#[async_trait]
impl FrameHandler for AntiCheatHandler {
    async fn handle(&mut self, text: &str) {
        self.process(text).await;
    }
}
