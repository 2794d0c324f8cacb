use anyhow::Context;
use chrono::Utc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use swingbot::api::{AlpacaClient, TwelveDataClient};
use swingbot::engine::DecisionEngine;
use swingbot::notify::DiscordNotifier;
use swingbot::persistence::ConfigStore;
use swingbot::scheduler;
use swingbot::session::SessionTracker;

// Tick cadence, snapped to wall-clock boundaries so sampling times are
// comparable across restarts
const DEFAULT_TICK_INTERVAL_SECS: u64 = 30;
// Extra delay before the first tick to let startup settle
const STARTUP_SETTLE_SECS: u64 = 10;
// Price checks run on this rotation while the market is open
const DEFAULT_SAMPLE_INTERVAL_MINUTES: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    tracing::info!("🚀 Swingbot starting");

    // Credentials are required; the process refuses to start without them
    let key_id = require_env("APCA_API_KEY_ID")?;
    let secret_key = require_env("APCA_API_SECRET_KEY")?;
    let price_api_key = require_env("TWELVEDATA_API_KEY")?;
    let webhook_url = require_env("DISCORD_WEBHOOK_URL")?;

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let symbol = std::env::var("SYMBOL").unwrap_or_else(|_| "TSLA".to_string());
    let local_cache =
        std::env::var("LOCAL_CACHE_PATH").unwrap_or_else(|_| "local.json".to_string());
    let config_key = std::env::var("CONFIG_KEY").unwrap_or_else(|_| "swingbot".to_string());
    let tick_interval_secs = env_or("TICK_INTERVAL_SECS", DEFAULT_TICK_INTERVAL_SECS);
    let sample_interval_minutes =
        env_or("SAMPLE_INTERVAL_MINUTES", DEFAULT_SAMPLE_INTERVAL_MINUTES);

    let broker =
        AlpacaClient::new(key_id, secret_key).context("building Alpaca client")?;
    let prices =
        TwelveDataClient::new(price_api_key).context("building Twelve Data client")?;
    let notifier = DiscordNotifier::new(webhook_url);

    let mut store = ConfigStore::new(&redis_url, local_cache, config_key).await;
    let mut config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Cannot load initial trading config: {}", e);
            anyhow::bail!("startup aborted: no loadable trading config");
        }
    };

    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Symbol: {}", symbol);
    tracing::info!("  Midpoint: {:?}", config.midpoint);
    tracing::info!("  Margins: ±{} / ±{}%", config.margin_diff, config.margin_perc * 100.0);
    tracing::info!("  Heading: {:?}", config.heading);
    tracing::info!("  Buy fraction: {}%", config.buy_perc * 100.0);

    let engine = DecisionEngine::new(symbol, prices, broker.clone());
    let mut tracker = SessionTracker::new();

    // First tick lands just past a 30-second snap point, plus the settle
    // delay; the interval keeps every later tick on the same snap points.
    let delay = scheduler::delay_until_boundary(Utc::now(), tick_interval_secs)
        + Duration::from_secs(STARTUP_SETTLE_SECS);
    tracing::info!("First tick in {:?}", delay);

    let mut ticker = interval_at(
        Instant::now() + delay,
        Duration::from_secs(tick_interval_secs),
    );
    // The tick body is awaited inline, so a slow tick can never overlap
    // the next one; late ticks are skipped, not replayed.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = ticker.tick() => {}
        }

        let now = Utc::now();
        tracker.tick(now, &broker, &notifier).await;

        if tracker.state.is_open && scheduler::is_sample_tick(now, sample_interval_minutes) {
            engine.check(&mut config, &mut store, &notifier).await;
        }
    }

    tracing::info!("👋 Swingbot stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "swingbot=info,swingbot::engine=debug".to_string()),
        )
        .init();
}

fn require_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{} not found in environment", name))
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
