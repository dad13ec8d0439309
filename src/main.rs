use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use privacy_auditor::channels::{Channel, TelegramChannel};
use privacy_auditor::catalog::Catalog;
use privacy_auditor::config::{self, BotConfig};
use privacy_auditor::dispatcher::Dispatcher;
use privacy_auditor::session::store::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stdout and bot.log, like the rest of the fleet expects.
    let file_appender = tracing_appender::rolling::never(".", "bot.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    let config = BotConfig::from_env();

    let token = match config::load_token() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("🤖 {} v{}", config.bot_name, env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Admins: {}",
        if config.admin_ids.is_empty() {
            "none".to_string()
        } else {
            config
                .admin_ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
    );

    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(token));
    if let Err(e) = channel.health_check().await {
        eprintln!("Error: Telegram is unreachable: {e}");
        std::process::exit(1);
    }
    eprintln!("   Telegram: connected");
    eprintln!("\n📱 Откройте Telegram и напишите боту /start");
    eprintln!("⏹️  Для остановки нажмите Ctrl+C\n");

    let store = Arc::new(SessionStore::new());
    let dispatcher = Arc::new(Dispatcher::new(
        config,
        Catalog::standard(),
        store,
        channel,
    ));

    dispatcher.run().await?;

    tracing::info!("Bot stopped");
    Ok(())
}
