use std::time::{Duration, Instant};

/// Token bucket for client messages on one socket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    capacity: u32,
    refill_every: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        // Bursts of 30 messages, then one every 500ms
        Self::with_limits(30, Duration::from_millis(500))
    }

    pub fn with_limits(capacity: u32, refill_every: Duration) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_every,
            last_refill: Instant::now(),
        }
    }

    /// Takes a token if one is left.
    pub fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn remaining(&mut self) -> u32 {
        self.refill(Instant::now());
        self.tokens
    }

    fn refill(&mut self, now: Instant) {
        if self.refill_every.is_zero() {
            self.tokens = self.capacity;
            return;
        }

        let elapsed = now.duration_since(self.last_refill);
        let earned = (elapsed.as_nanos() / self.refill_every.as_nanos()) as u32;
        if earned > 0 {
            self.tokens = self.tokens.saturating_add(earned).min(self.capacity);
            // Keep the remainder so slow trickles still add up
            self.last_refill += self.refill_every * earned;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
