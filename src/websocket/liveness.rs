use tokio::time::{Duration, Instant};

/// Tracks the heartbeat of one connection.
///
/// A ping is due once `ping_interval` has elapsed since the last one. A read
/// that stays silent for the stall timeout also forces a ping; neither
/// condition closes the connection by itself.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    ping_interval: Duration,
    last_ping: Option<Instant>,
}

impl LivenessMonitor {
    pub fn new(ping_interval: Duration) -> Self {
        Self {
            ping_interval,
            last_ping: None,
        }
    }

    pub fn mark_ping_sent(&mut self, now: Instant) {
        self.last_ping = Some(now);
    }

    /// Seconds since the last ping; infinite if none was sent yet.
    pub fn seconds_since_last_ping(&self, now: Instant) -> f64 {
        match self.last_ping {
            Some(at) => now.saturating_duration_since(at).as_secs_f64(),
            None => f64::INFINITY,
        }
    }

    pub fn ping_due(&self, now: Instant) -> bool {
        self.seconds_since_last_ping(now) >= self.ping_interval.as_secs_f64()
    }

    /// Time left until the next ping is due, zero if it already is.
    pub fn until_ping_due(&self, now: Instant) -> Duration {
        match self.last_ping {
            Some(at) => (at + self.ping_interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }
}
