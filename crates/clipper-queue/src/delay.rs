//! Publish pacing.
//!
//! Computes the wait interval before each publish action. The random
//! source is injected so tests can fix the draw.

use rand::Rng;
use std::time::Duration;

use clipper_models::AccountConfig;

/// Pacing snapshot taken from the account config at job start.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishPacing {
    /// Base interval between publishes, in minutes.
    pub base_minutes: f64,
    /// Whether to randomize around the base.
    pub randomize: bool,
    /// Uniform spread around the base, in minutes.
    pub spread_minutes: f64,
}

impl PublishPacing {
    pub fn new(base_minutes: f64, randomize: bool, spread_minutes: f64) -> Self {
        Self {
            base_minutes,
            randomize,
            spread_minutes,
        }
    }

    pub fn from_config(config: &AccountConfig) -> Self {
        Self {
            base_minutes: config.publish_interval_minutes,
            randomize: config.randomize_interval,
            spread_minutes: config.randomization_spread_minutes,
        }
    }

    /// Delay before the next publish.
    ///
    /// With randomization off this is exactly the base interval. With it
    /// on, the delay is drawn uniformly (in whole seconds) from
    /// `[base - spread, base + spread]`, clamped at zero; delays never go
    /// negative.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let base_secs = (self.base_minutes * 60.0).round().max(0.0) as i64;
        if !self.randomize {
            return Duration::from_secs(base_secs as u64);
        }
        let spread_secs = (self.spread_minutes * 60.0).round().max(0.0) as i64;
        let sampled = rng.random_range(base_secs - spread_secs..=base_secs + spread_secs);
        Duration::from_secs(sampled.max(0) as u64)
    }
}
