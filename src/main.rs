use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use botforge::chatbot::{BotService, Database, TelegramClient};
use botforge::config::Config;
use botforge::server;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "botforge.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "botforge.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting botforge...");
    info!("Loaded config from {config_path}");
    if config.dry_run {
        info!("DRY RUN mode enabled");
    }

    let database = match Database::open(&config.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    let service = Arc::new(BotService::new(config.service_config(), database));

    if config.webhook_addr.is_none() && config.telegram.is_none() {
        warn!("Neither webhook_addr nor telegram_bot_token is configured, nothing to serve");
        return;
    }

    if let Some(addr) = config.webhook_addr.clone() {
        let service = service.clone();
        std::thread::spawn(move || {
            if let Err(e) = server::serve(&addr, service) {
                error!("Webhook server stopped: {e}");
            }
        });
    }

    match config.telegram {
        Some(ref telegram) => {
            let bot = Bot::new(&telegram.token);
            TelegramClient::new(bot, service, telegram.bot_id).run().await;
        }
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
        }
    }

    info!("Shutting down");
}
