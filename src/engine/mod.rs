use reqwest::StatusCode;

use crate::api::{AlpacaClient, TwelveDataClient};
use crate::models::{Heading, OrderIntent, OrderSide, TradingConfig};
use crate::notify::DiscordNotifier;
use crate::persistence::ConfigStore;

/// What a single price sample asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// First sample ever: anchor the midpoint, no trade
    Bootstrap { midpoint: f64 },
    /// Trend intact: drag the anchor along with price
    Reanchor { midpoint: f64 },
    /// Trend broke: re-anchor and drop back to neutral, no order
    TrendExit { midpoint: f64 },
    /// Neutral breakout past a bound: attempt an order
    Trade(OrderSide),
    Hold,
}

/// Heading bounds around the midpoint. Taking min/max across the absolute
/// and relative margins means the looser of the two governs each side.
pub fn bounds(midpoint: f64, margin_diff: f64, margin_perc: f64) -> (f64, f64) {
    let lower = (midpoint - margin_diff).min(midpoint * (1.0 - margin_perc));
    let upper = (midpoint + margin_diff).max(midpoint * (1.0 + margin_perc));
    (lower, upper)
}

/// The midpoint/heading state machine, as a pure function of the current
/// config and one price sample.
pub fn decide(config: &TradingConfig, price: f64) -> Decision {
    let Some(midpoint) = config.midpoint else {
        return Decision::Bootstrap { midpoint: price };
    };

    let (lower, upper) = bounds(midpoint, config.margin_diff, config.margin_perc);

    match config.heading {
        Heading::Up => {
            if price >= midpoint {
                Decision::Reanchor { midpoint: price }
            } else if price < lower {
                Decision::TrendExit { midpoint: price }
            } else {
                Decision::Hold
            }
        }
        Heading::Down => {
            if price <= midpoint {
                Decision::Reanchor { midpoint: price }
            } else if price > upper {
                Decision::TrendExit { midpoint: price }
            } else {
                Decision::Hold
            }
        }
        Heading::Neutral => {
            if price > upper {
                Decision::Trade(OrderSide::Buy)
            } else if price < lower {
                Decision::Trade(OrderSide::Sell)
            } else {
                Decision::Hold
            }
        }
    }
}

/// Order sizing and refusal guards, evaluated against freshly fetched
/// account and position data. A refused order is a no-op, not an error.
pub fn plan_order(
    config: &TradingConfig,
    side: OrderSide,
    symbol: &str,
    price: f64,
    cash: f64,
    position_qty: f64,
) -> Option<OrderIntent> {
    let qty = match side {
        OrderSide::Buy => {
            // Can't buy if already holding
            if position_qty > 0.0 {
                return None;
            }
            cash * config.buy_perc / price
        }
        OrderSide::Sell => {
            // Can't sell what we don't hold; sells always unwind everything
            if position_qty <= 0.0 {
                return None;
            }
            position_qty
        }
    };

    Some(OrderIntent {
        side,
        symbol: symbol.to_string(),
        qty,
        reference_price: price,
    })
}

/// Runs the decision state machine for one symbol: samples the price feed,
/// applies the heading logic, places breakout orders through the broker.
pub struct DecisionEngine {
    symbol: String,
    prices: TwelveDataClient,
    broker: AlpacaClient,
}

impl DecisionEngine {
    pub fn new(symbol: String, prices: TwelveDataClient, broker: AlpacaClient) -> Self {
        Self {
            symbol,
            prices,
            broker,
        }
    }

    /// One sampling tick. Every midpoint/heading mutation is persisted
    /// before this returns; fetch failures skip the tick and defer to the
    /// next one.
    pub async fn check(
        &self,
        config: &mut TradingConfig,
        store: &mut ConfigStore,
        notifier: &DiscordNotifier,
    ) {
        let price = match self.prices.get_price(&self.symbol).await {
            Ok(Some(price)) => price,
            Ok(None) => {
                tracing::warn!("{}: no price sample this tick", self.symbol);
                return;
            }
            Err(e) => {
                tracing::warn!("{}: price fetch failed: {}", self.symbol, e);
                return;
            }
        };

        tracing::info!("💹 {} @ ${:.4}", self.symbol, price);

        match decide(config, price) {
            Decision::Bootstrap { midpoint } => {
                config.midpoint = Some(midpoint);
                tracing::info!("Anchored midpoint at ${:.4}", midpoint);
                persist(store, config).await;
            }
            Decision::Reanchor { midpoint } => {
                config.midpoint = Some(midpoint);
                tracing::debug!("Re-anchored midpoint at ${:.4}", midpoint);
                persist(store, config).await;
            }
            Decision::TrendExit { midpoint } => {
                config.midpoint = Some(midpoint);
                config.heading = Heading::Neutral;
                tracing::info!("Trend broke, re-anchored at ${:.4} and back to neutral", midpoint);
                persist(store, config).await;
            }
            Decision::Trade(side) => {
                self.submit(side, price, config, notifier).await;
            }
            Decision::Hold => {}
        }
    }

    /// Fetch holdings and cash, apply the refusal guards, then submit and
    /// report. Deliberately leaves midpoint/heading untouched whatever the
    /// order outcome - re-anchoring branches own all config mutation.
    async fn submit(
        &self,
        side: OrderSide,
        price: f64,
        config: &TradingConfig,
        notifier: &DiscordNotifier,
    ) {
        let position_qty = match self.broker.get_position(&self.symbol).await {
            Ok(qty) => qty,
            Err(e) => {
                tracing::warn!("{}: position fetch failed, order skipped: {}", self.symbol, e);
                return;
            }
        };

        let account = match self.broker.get_account().await {
            Ok(account) => account,
            Err(e) => {
                tracing::warn!("{}: account fetch failed, order skipped: {}", self.symbol, e);
                return;
            }
        };

        let Some(intent) = plan_order(config, side, &self.symbol, price, account.cash, position_qty)
        else {
            tracing::info!(
                "{} breakout at ${:.4} refused ({} with position qty {})",
                self.symbol,
                price,
                side,
                position_qty
            );
            return;
        };

        match self.broker.place_order(&intent).await {
            Ok(status) => {
                if !status.is_success() {
                    tracing::warn!("Order not accepted: {}", status);
                }
                notifier.send(&order_report(&intent, status)).await;
            }
            Err(e) => {
                tracing::error!("Order submission failed: {}", e);
            }
        }
    }
}

fn order_report(intent: &OrderIntent, status: StatusCode) -> String {
    format!(
        "New Order Created:\n\n    TYPE: `{}`\n    QTY: `{}`\n    ESTIMATED VALUE: `{:.2}`\n    STATUS: `{}`",
        intent.side,
        intent.qty,
        intent.estimated_value(),
        status.as_u16()
    )
}

async fn persist(store: &mut ConfigStore, config: &TradingConfig) {
    if let Err(e) = store.save(config).await {
        tracing::error!(
            "Config persist failed, in-memory and stored state may diverge: {}",
            e
        );
    }
}
