use chrono::{DateTime, Utc};

use crate::api::{AlpacaClient, MarketClock};
use crate::notify::DiscordNotifier;

/// Market session open/close state and its next transition boundaries.
/// Rebuilt from the market clock whenever both boundaries are behind us.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub is_open: bool,
    pub next_open: Option<DateTime<Utc>>,
    pub next_close: Option<DateTime<Utc>>,
}

impl SessionState {
    /// True when the boundaries were never fetched, or `now` has passed
    /// both of them and neither can be trusted.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match (self.next_open, self.next_close) {
            (Some(open), Some(close)) => now > open && now > close,
            _ => true,
        }
    }

    /// Replace open/close state together from one clock payload. The two
    /// boundaries are never updated separately.
    pub fn apply_clock(&mut self, clock: &MarketClock) {
        self.is_open = clock.is_open;
        self.next_open = Some(clock.next_open);
        self.next_close = Some(clock.next_close);
    }

    /// Flip open/closed if `now` crossed the boundary relevant to the
    /// current state. Returns whether a transition happened.
    pub fn check_transition(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_stale(now) {
            return false;
        }
        let (Some(next_open), Some(next_close)) = (self.next_open, self.next_close) else {
            return false;
        };

        let crossed = if self.is_open {
            now > next_close
        } else {
            now > next_open
        };

        if crossed {
            self.is_open = !self.is_open;
        }
        crossed
    }
}

/// Tracks the market session across ticks and reports transitions to the
/// operator channel.
pub struct SessionTracker {
    pub state: SessionState,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
        }
    }

    /// One session decision per tick: refresh stale boundaries, or check
    /// for a boundary crossing - never both.
    pub async fn tick(
        &mut self,
        now: DateTime<Utc>,
        clock: &AlpacaClient,
        notifier: &DiscordNotifier,
    ) {
        if self.state.is_stale(now) {
            match clock.get_clock().await {
                Ok(payload) => {
                    self.state.apply_clock(&payload);
                    tracing::info!(
                        "⏰ Market clock refreshed: open={}, next_open={}, next_close={}",
                        payload.is_open,
                        payload.next_open,
                        payload.next_close
                    );
                }
                Err(e) => {
                    tracing::warn!("Market clock fetch failed, retrying next tick: {}", e);
                }
            }
        } else if self.state.check_transition(now) {
            let report = self.session_report();
            tracing::info!("{}", report);
            notifier.send(&report).await;
        }
    }

    fn session_report(&self) -> String {
        match (self.state.is_open, self.state.next_close, self.state.next_open) {
            (true, Some(close), _) => {
                format!("Market is now OPEN. Next close: {}", close.format("%Y-%m-%d %H:%M %Z"))
            }
            (false, _, Some(open)) => {
                format!("Market is now CLOSED. Next open: {}", open.format("%Y-%m-%d %H:%M %Z"))
            }
            _ => "Market session state updated".to_string(),
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
