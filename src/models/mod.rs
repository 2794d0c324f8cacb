use serde::{Deserialize, Serialize};

/// Directional trend state the decision engine is currently in.
///
/// Persisted as an integer (1 / -1 / 0). Anything else found in a stored
/// document (null, missing field, stray values) reads back as `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<i8>", into = "i8")]
pub enum Heading {
    Up,
    Down,
    #[default]
    Neutral,
}

impl From<Option<i8>> for Heading {
    fn from(raw: Option<i8>) -> Self {
        match raw {
            Some(1) => Heading::Up,
            Some(-1) => Heading::Down,
            _ => Heading::Neutral,
        }
    }
}

impl From<Heading> for i8 {
    fn from(heading: Heading) -> Self {
        match heading {
            Heading::Up => 1,
            Heading::Down => -1,
            Heading::Neutral => 0,
        }
    }
}

/// Persisted trading configuration - one document per deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingConfig {
    /// Reference price the engine tracks as current fair value.
    /// None until the first sample anchors it.
    #[serde(default)]
    pub midpoint: Option<f64>,
    /// Absolute price-distance threshold
    pub margin_diff: f64,
    /// Relative price-distance threshold (fraction of midpoint)
    pub margin_perc: f64,
    #[serde(default)]
    pub heading: Heading,
    /// Fraction of available cash committed to a buy order
    pub buy_perc: f64,
}

impl TradingConfig {
    /// A non-neutral heading without an anchor cannot be evaluated.
    /// Drops back to neutral and reports whether anything changed.
    pub fn normalize(&mut self) -> bool {
        if self.heading != Heading::Neutral && self.midpoint.is_none() {
            self.heading = Heading::Neutral;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// A decided-but-not-yet-confirmed instruction to buy or sell.
/// Built by the decision engine, submitted immediately, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub side: OrderSide,
    pub symbol: String,
    pub qty: f64,
    pub reference_price: f64,
}

impl OrderIntent {
    pub fn estimated_value(&self) -> f64 {
        self.qty * self.reference_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> TradingConfig {
        TradingConfig {
            midpoint: Some(100.0),
            margin_diff: 3.0,
            margin_perc: 0.02,
            heading: Heading::Up,
            buy_perc: 0.5,
        }
    }

    #[test]
    fn test_config_round_trip() {
        let config = base_config();
        let json = serde_json::to_string(&config).unwrap();
        let restored: TradingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_heading_serializes_as_integer() {
        let json = serde_json::to_string(&base_config()).unwrap();
        assert!(json.contains("\"heading\":1"));
    }

    #[test]
    fn test_heading_reads_leniently() {
        for (raw, expected) in [
            ("1", Heading::Up),
            ("-1", Heading::Down),
            ("0", Heading::Neutral),
            ("null", Heading::Neutral),
            ("7", Heading::Neutral),
        ] {
            let json = format!(
                r#"{{"midpoint":100.0,"margin_diff":3.0,"margin_perc":0.0,"heading":{},"buy_perc":0.5}}"#,
                raw
            );
            let config: TradingConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(config.heading, expected, "raw heading {}", raw);
        }
    }

    #[test]
    fn test_missing_fields_default_to_unset() {
        let json = r#"{"margin_diff":3.0,"margin_perc":0.0,"buy_perc":0.5}"#;
        let config: TradingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.midpoint, None);
        assert_eq!(config.heading, Heading::Neutral);
    }

    #[test]
    fn test_normalize_drops_unanchored_heading() {
        let mut config = base_config();
        config.midpoint = None;

        assert!(config.normalize());
        assert_eq!(config.heading, Heading::Neutral);

        // Already consistent - nothing to do
        let mut config = base_config();
        assert!(!config.normalize());
        assert_eq!(config.heading, Heading::Up);
    }

    #[test]
    fn test_order_intent_value() {
        let intent = OrderIntent {
            side: OrderSide::Buy,
            symbol: "TSLA".to_string(),
            qty: 2.5,
            reference_price: 200.0,
        };
        assert_eq!(intent.estimated_value(), 500.0);
        assert_eq!(intent.side.to_string(), "buy");
    }
}
