//! Backoff delay calculation

use crate::types::BackoffConfig;
use rand::Rng;
use std::time::Duration;

impl BackoffConfig {
    /// Delay before retry `attempt` (1-based), before jitter
    ///
    /// `min(base * multiplier^(attempt-1), max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let exp_delay = (self.base_delay_ms as f64) * self.backoff_multiplier.powi(exponent);
        let capped = exp_delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_secs_f64(capped / 1_000.0)
    }

    /// Jitter ratio actually applied: non-finite counts as 0, otherwise |r| capped at 1
    pub fn effective_jitter(&self) -> f64 {
        if self.jitter_ratio.is_finite() {
            self.jitter_ratio.abs().min(1.0)
        } else {
            0.0
        }
    }

    /// Delay before retry `attempt` with an independent jitter factor drawn from `rng`
    pub fn jittered_delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.delay_for(attempt);
        let ratio = self.effective_jitter();
        if ratio == 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = 1.0 + rng.gen_range(-ratio..=ratio);
        delay.mul_f64(factor.max(0.0))
    }

    /// Upper bound of the summed backoff across every retry
    pub fn max_total_delay(&self) -> Duration {
        (1..=self.max_retries)
            .map(|attempt| self.delay_for(attempt).mul_f64(1.0 + self.effective_jitter()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn exponential_growth() {
        let config = BackoffConfig::default();

        assert_eq!(config.delay_for(0), Duration::ZERO);
        assert_eq!(config.delay_for(1).as_millis(), 1_000);
        assert_eq!(config.delay_for(2).as_millis(), 2_000);
        assert_eq!(config.delay_for(3).as_millis(), 4_000);
        assert_eq!(config.delay_for(4).as_millis(), 8_000);

        // Capped at max_delay_ms
        assert_eq!(config.delay_for(5).as_millis(), 10_000);
        assert_eq!(config.delay_for(40).as_millis(), 10_000);
    }

    #[test]
    fn jitter_stays_within_ratio() {
        let config = BackoffConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 1..=6 {
            let base = config.delay_for(attempt).as_secs_f64();
            for _ in 0..200 {
                let jittered = config.jittered_delay_for(attempt, &mut rng).as_secs_f64();
                assert!(jittered >= base * 0.75 - 1e-9, "{jittered} < {base} * 0.75");
                assert!(jittered <= base * 1.25 + 1e-9, "{jittered} > {base} * 1.25");
            }
        }
    }

    #[test]
    fn jitter_is_drawn_per_delay() {
        let config = BackoffConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<Duration> = (0..10)
            .map(|_| config.jittered_delay_for(1, &mut rng))
            .collect();
        assert!(samples.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn zero_jitter_is_exact() {
        let config = BackoffConfig {
            jitter_ratio: 0.0,
            ..BackoffConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(config.jittered_delay_for(2, &mut rng).as_millis(), 2_000);
    }

    #[test]
    fn non_finite_jitter_is_ignored() {
        let mut rng = StdRng::seed_from_u64(3);
        for ratio in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let config = BackoffConfig {
                jitter_ratio: ratio,
                ..BackoffConfig::default()
            };
            assert_eq!(config.effective_jitter(), 0.0);
            assert_eq!(config.jittered_delay_for(1, &mut rng).as_millis(), 1_000);
        }

        let wide = BackoffConfig {
            jitter_ratio: 4.0,
            ..BackoffConfig::default()
        };
        assert_eq!(wide.effective_jitter(), 1.0);
        for _ in 0..50 {
            assert!(wide.jittered_delay_for(1, &mut rng) <= Duration::from_millis(2_000));
        }
    }

    #[test]
    fn total_delay_bound() {
        let config = BackoffConfig {
            max_retries: 2,
            ..BackoffConfig::default()
        };
        // (1000 + 2000) * 1.25
        assert_eq!(config.max_total_delay().as_millis(), 3_750);
    }
}
