//! Relay Service - bridges game-server status messages to a OneBot chat bot
//!
//! ```
//! game server ──Room (:25000)──────> RoomHandler ──────┐
//!                                                      ├──> OneBot HTTP API
//! game server ──Anti-cheat (:25250)─> AntiCheatHandler ┘
//!                                          └──> ban log (EAC.txt)
//! ```

use anyhow::Result;
use dotenv::dotenv;
use log::{error, info, warn};
use relay_core::{BanLog, Notifier, OneBotClient, RoomRegistry};
use relay_service_rust::{
    AntiCheatHandler, FrameHandler, IngestionListener, ListenerOptions, RelayConfig, RoomHandler,
};
use std::sync::Arc;

async fn stop_listener<H: FrameHandler>(listener: Option<IngestionListener<H>>) {
    if let Some(mut listener) = listener {
        if let Err(e) = listener.stop().await {
            error!("Failed to stop {} listener: {}", listener.name(), e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting Relay Service...");

    let cfg = RelayConfig::from_env()?;
    cfg.log_config();

    let bot = Arc::new(OneBotClient::new(
        cfg.bot_http_url.clone(),
        cfg.message_target(),
        cfg.bot_http_timeout,
    ));
    if let Err(e) = bot.connect().await {
        error!("Failed to connect bot: {:#}", e);
    }
    let notifier: Arc<dyn Notifier> = bot;

    let ban_log = match BanLog::open(&cfg.ban_log_path).await {
        Ok(log) => {
            info!("Ban log: {}", log.path().display());
            Some(log)
        }
        Err(e) => {
            error!("Running without ban log: {:#}", e);
            None
        }
    };

    let options = ListenerOptions {
        read_timeout: cfg.frame_read_timeout,
        connection_policy: cfg.connection_policy,
    };

    let room_handler = RoomHandler::new(
        RoomRegistry::with_capacity(cfg.room_registry_capacity),
        notifier.clone(),
    );
    let room = match IngestionListener::start(
        "Room",
        cfg.bind_ip,
        cfg.room_port,
        room_handler,
        options.clone(),
    )
    .await
    {
        Ok(l) => Some(l),
        Err(e) => {
            error!("Failed to create Room listener: {}", e);
            None
        }
    };

    let anticheat_handler = AntiCheatHandler::new(cfg.ban_threshold, ban_log, notifier)
        .with_idle_ttl(cfg.report_idle_ttl);
    let anticheat = match IngestionListener::start(
        "AntiCheat",
        cfg.bind_ip,
        cfg.anticheat_port,
        anticheat_handler,
        options,
    )
    .await
    {
        Ok(l) => Some(l),
        Err(e) => {
            error!("Failed to create AntiCheat listener: {}", e);
            None
        }
    };

    if room.is_none() && anticheat.is_none() {
        warn!("No listener is running");
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    stop_listener(room).await;
    stop_listener(anticheat).await;

    info!("Relay Service stopped");
    Ok(())
}
