//! Configuration for the notification channel.

use std::time::Duration;

/// Default push server endpoint.
pub const DEFAULT_STREAM_URL: &str = "ws://127.0.0.1:8080";

/// Configuration for the notification channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Push server URL.
    pub url: String,
    /// How long to wait for an acknowledgement before giving up.
    pub response_timeout: Duration,
    /// Delay before reconnecting after an established connection drops.
    pub reconnect_delay: Duration,
    /// Waits between failed connection attempts.
    pub retry: RetrySchedule,
    /// Capacity of the library change broadcast.
    pub event_capacity: usize,
}

impl ChannelConfig {
    /// Creates a configuration for the given server URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            response_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(1),
            retry: RetrySchedule::default(),
            event_capacity: 64,
        }
    }

    /// Sets the acknowledgement timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the delay before reconnecting after a dropped connection.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the retry schedule.
    pub fn with_retry(mut self, retry: RetrySchedule) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the capacity of the change broadcast.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_URL)
    }
}

/// Fixed sequence of waits between failed connection attempts.
///
/// Attempts past the end of the schedule reuse the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    /// Creates a schedule from explicit delays.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Creates a schedule from delays in whole seconds.
    pub fn from_secs(secs: &[u64]) -> Self {
        Self::new(secs.iter().copied().map(Duration::from_secs).collect())
    }

    /// Returns the configured delays.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Returns the wait before retry `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self.delays.len() {
            0 => Duration::ZERO,
            len => self.delays[attempt.min(len - 1)],
        }
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from_secs(&[2, 5, 10, 15, 30, 60, 120, 300, 600, 1200, 1800, 3600])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn channel_config_builder() {
        let config = ChannelConfig::new("ws://localhost:9000")
            .with_response_timeout(Duration::from_secs(3))
            .with_reconnect_delay(Duration::from_millis(250))
            .with_event_capacity(0);

        assert_eq!(config.url, "ws://localhost:9000");
        assert_eq!(config.response_timeout, Duration::from_secs(3));
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn default_schedule() {
        let schedule = RetrySchedule::default();
        assert_eq!(schedule.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(schedule.delay_for_attempt(3), Duration::from_secs(15));
        assert_eq!(schedule.delay_for_attempt(11), Duration::from_secs(3600));
        assert_eq!(schedule.delay_for_attempt(500), Duration::from_secs(3600));
    }

    #[test]
    fn empty_schedule_has_no_delay() {
        assert_eq!(RetrySchedule::new(Vec::new()).delay_for_attempt(4), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn delay_is_clamped_to_last_entry(
            secs in proptest::collection::vec(1u64..10_000, 1..20),
            attempt in 0usize..1_000,
        ) {
            let schedule = RetrySchedule::from_secs(&secs);
            let expected = secs[attempt.min(secs.len() - 1)];
            prop_assert_eq!(schedule.delay_for_attempt(attempt), Duration::from_secs(expected));
        }
    }
}
