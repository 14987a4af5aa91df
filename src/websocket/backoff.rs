//! Reconnect wait with full jitter.
//!
//! The wait after the n-th consecutive failure is
//! `round(uniform(0, 1) * min(cap, 2^n - 1) + 1)` seconds, so it always lies
//! in `[1, cap + 1]` and its upper bound doubles until it reaches the cap.

use rand::Rng;
use tokio::time::Duration;

pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 180;

/// Largest wait (before the `+ 1` offset) the formula can yield for `attempts`.
pub fn jitter_ceiling(attempts: u32, cap_secs: u64) -> u64 {
    let exp = 1u64.checked_shl(attempts).unwrap_or(u64::MAX);
    exp.saturating_sub(1).min(cap_secs)
}

/// Upper bound of the wait for `attempts`, in seconds.
pub fn max_wait_secs(attempts: u32, cap_secs: u64) -> u64 {
    jitter_ceiling(attempts, cap_secs) + 1
}

/// Computes the wait from an explicit jitter sample in `[0, 1)`.
pub fn wait_for_sample(attempts: u32, cap_secs: u64, sample: f64) -> Duration {
    let sample = sample.clamp(0.0, 1.0);
    let secs = (sample * jitter_ceiling(attempts, cap_secs) as f64 + 1.0).round();
    Duration::from_secs(secs as u64)
}

pub fn reconnect_wait<R: Rng + ?Sized>(attempts: u32, cap_secs: u64, rng: &mut R) -> Duration {
    wait_for_sample(attempts, cap_secs, rng.gen::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_bound_non_decreasing_and_capped() {
        let mut previous = 0;
        for attempts in 1..=10 {
            let bound = max_wait_secs(attempts, DEFAULT_BACKOFF_CAP_SECS);
            assert!(bound >= previous);
            assert!(bound <= 181);
            previous = bound;
        }
        assert_eq!(max_wait_secs(1, DEFAULT_BACKOFF_CAP_SECS), 2);
        assert_eq!(max_wait_secs(7, DEFAULT_BACKOFF_CAP_SECS), 128);
        assert_eq!(max_wait_secs(8, DEFAULT_BACKOFF_CAP_SECS), 181);
        assert_eq!(max_wait_secs(64, DEFAULT_BACKOFF_CAP_SECS), 181);
    }

    #[test]
    fn test_sample_extremes() {
        assert_eq!(wait_for_sample(5, 180, 0.0), Duration::from_secs(1));
        assert_eq!(wait_for_sample(5, 180, 1.0), Duration::from_secs(32));
        assert_eq!(wait_for_sample(20, 180, 1.0), Duration::from_secs(181));
        // 0.5 * 3 + 1 = 2.5 rounds away from zero
        assert_eq!(wait_for_sample(2, 180, 0.5), Duration::from_secs(3));
    }

    #[test]
    fn test_random_waits_stay_in_range() {
        let mut rng = rand::thread_rng();
        for attempts in 1..=10 {
            for _ in 0..200 {
                let wait = reconnect_wait(attempts, DEFAULT_BACKOFF_CAP_SECS, &mut rng);
                assert!(wait >= Duration::from_secs(1));
                assert!(wait <= Duration::from_secs(max_wait_secs(attempts, 180)));
            }
        }
    }
}
