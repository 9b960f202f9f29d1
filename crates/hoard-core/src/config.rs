//! Tunable parameters for markets and offline catch-up.
//!
//! Every field has a default, so partial config files deserialize cleanly.
//! Out-of-range values are clamped by [`EconomyConfig::sanitized`] rather
//! than rejected.

use serde::{Deserialize, Serialize};

/// Price simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Random jitter amplitude applied to the target price.
    pub volatility: f64,
    /// Multiplier on current price when buying from the market.
    pub buy_markup: f64,
    /// Multiplier on current price when selling to the market.
    pub sell_markdown: f64,
    /// Fraction of supply and demand forgotten per second.
    pub supply_decay: f64,
    /// Fraction of the gap to the target price closed per second.
    pub price_speed: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            volatility: 0.1,
            buy_markup: 1.1,
            sell_markdown: 0.9,
            supply_decay: 0.05,
            price_speed: 0.5,
        }
    }
}

/// Offline progress parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Fraction of online production rate achieved while away.
    pub efficiency: f64,
    /// Cap on simulated absence; infinite disables the cap.
    pub max_hours: f64,
    /// Absences shorter than this produce nothing.
    pub min_seconds: f64,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            efficiency: 1.0,
            max_hours: 24.0,
            min_seconds: 60.0,
        }
    }
}

/// Top-level economy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub market: MarketConfig,
    pub offline: OfflineConfig,
    /// Seed for every component RNG created by the economy.
    pub seed: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            offline: OfflineConfig::default(),
            seed: 0x5EED,
        }
    }
}

fn non_negative(value: f64, fallback: f64) -> f64 {
    if value.is_nan() { fallback } else { value.max(0.0) }
}

fn unit_interval(value: f64, fallback: f64) -> f64 {
    if value.is_nan() { fallback } else { value.clamp(0.0, 1.0) }
}

impl MarketConfig {
    /// Clamp every field into its meaningful range: volatility and markdown
    /// into `[0, 1]`, the rest to non-negative. NaN falls back to the default.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            volatility: unit_interval(self.volatility, d.volatility),
            buy_markup: non_negative(self.buy_markup, d.buy_markup),
            sell_markdown: unit_interval(self.sell_markdown, d.sell_markdown),
            supply_decay: non_negative(self.supply_decay, d.supply_decay),
            price_speed: non_negative(self.price_speed, d.price_speed),
        }
    }
}

impl OfflineConfig {
    /// Efficiency is capped at 1 so catch-up never outpaces live play.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            efficiency: unit_interval(self.efficiency, d.efficiency),
            max_hours: non_negative(self.max_hours, d.max_hours),
            min_seconds: non_negative(self.min_seconds, d.min_seconds),
        }
    }
}

impl EconomyConfig {
    pub fn sanitized(self) -> Self {
        Self {
            market: self.market.sanitized(),
            offline: self.offline.sanitized(),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EconomyConfig::default();
        assert_eq!(c.market.volatility, 0.1);
        assert_eq!(c.market.buy_markup, 1.1);
        assert_eq!(c.market.sell_markdown, 0.9);
        assert_eq!(c.market.supply_decay, 0.05);
        assert_eq!(c.market.price_speed, 0.5);
        assert_eq!(c.offline.efficiency, 1.0);
        assert_eq!(c.offline.max_hours, 24.0);
        assert_eq!(c.offline.min_seconds, 60.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: EconomyConfig =
            serde_json::from_str(r#"{ "market": { "volatility": 0.3 }, "seed": 7 }"#).unwrap();
        assert_eq!(c.market.volatility, 0.3);
        assert_eq!(c.market.buy_markup, 1.1);
        assert_eq!(c.offline, OfflineConfig::default());
        assert_eq!(c.seed, 7);
    }

    #[test]
    fn sanitized_clamps_negatives_and_nan() {
        let c = EconomyConfig {
            market: MarketConfig {
                volatility: -1.0,
                price_speed: f64::NAN,
                ..MarketConfig::default()
            },
            offline: OfflineConfig {
                max_hours: f64::INFINITY,
                efficiency: -0.5,
                ..OfflineConfig::default()
            },
            seed: 1,
        }
        .sanitized();
        assert_eq!(c.market.volatility, 0.0);
        assert_eq!(c.market.price_speed, 0.5);
        assert_eq!(c.offline.max_hours, f64::INFINITY);
        assert_eq!(c.offline.efficiency, 0.0);
    }

    #[test]
    fn sanitized_caps_fractions_at_one() {
        let c = EconomyConfig {
            market: MarketConfig {
                volatility: 5.0,
                sell_markdown: 3.0,
                buy_markup: 4.0,
                price_speed: 2.0,
                ..MarketConfig::default()
            },
            offline: OfflineConfig {
                efficiency: 2.0,
                min_seconds: 7200.0,
                ..OfflineConfig::default()
            },
            seed: 1,
        }
        .sanitized();
        assert_eq!(c.market.volatility, 1.0);
        assert_eq!(c.market.sell_markdown, 1.0);
        assert_eq!(c.offline.efficiency, 1.0);
        // Unbounded fields keep large values.
        assert_eq!(c.market.buy_markup, 4.0);
        assert_eq!(c.market.price_speed, 2.0);
        assert_eq!(c.offline.min_seconds, 7200.0);
    }
}
