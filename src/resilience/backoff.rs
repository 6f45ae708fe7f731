//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Fraction of the computed delay used as symmetric jitter.
pub const JITTER_RATIO: f64 = 0.1;

/// Un-jittered delay before retry number `attempt` (1-based).
///
/// `base * factor^(attempt - 1)`; attempt 0 means no wait.
pub fn backoff_delay(attempt: u32, base: Duration, factor: f64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let secs = base.as_secs_f64() * factor.powi(exponent);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Apply ±10% jitter to `delay`.
fn jittered(delay: Duration) -> Duration {
    let spread = delay.as_secs_f64() * JITTER_RATIO;
    if spread <= 0.0 {
        return delay;
    }

    let offset = rand::thread_rng().gen_range(-spread..=spread);
    Duration::try_from_secs_f64((delay.as_secs_f64() + offset).max(0.0)).unwrap_or(delay)
}

/// Calculate the jittered delay before retry number `attempt`.
pub fn calculate_backoff(attempt: u32, base: Duration, factor: f64) -> Duration {
    jittered(backoff_delay(attempt, base, factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(0, base, 2.0), Duration::ZERO);
        assert_eq!(backoff_delay(1, base, 2.0), Duration::from_millis(100));
        assert_eq!(backoff_delay(2, base, 2.0), Duration::from_millis(200));
        assert_eq!(backoff_delay(3, base, 2.0), Duration::from_millis(400));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let base = Duration::from_secs(1);
        for attempt in 1..=4 {
            let raw = backoff_delay(attempt, base, 2.0).as_secs_f64();
            for _ in 0..50 {
                let j = calculate_backoff(attempt, base, 2.0).as_secs_f64();
                assert!(j >= raw * 0.9 - 1e-9, "{j} below {raw}");
                assert!(j <= raw * 1.1 + 1e-9, "{j} above {raw}");
            }
        }
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let d = backoff_delay(10_000, Duration::from_secs(1), 2.0);
        assert_eq!(d, Duration::MAX);
    }
}
