//! Client configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on the TCP handshake.
    pub connect_timeout: Duration,

    /// Interval between poll ticks.
    pub poll_interval: Duration,

    /// Size of the scratch buffer used for each socket read.
    pub read_buffer_size: usize,

    /// Capacity of the event channel. Receivers that fall further behind
    /// than this lose the oldest events.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            read_buffer_size: 8 * 1024,
            event_capacity: 1024,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables, falling back to defaults.
    ///
    /// - `FOLDMON_CONNECT_TIMEOUT_MS`
    /// - `FOLDMON_POLL_INTERVAL_MS`
    /// - `FOLDMON_READ_BUFFER`
    /// - `FOLDMON_EVENT_CAPACITY`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            connect_timeout: env_millis("FOLDMON_CONNECT_TIMEOUT_MS")?
                .unwrap_or(defaults.connect_timeout),
            poll_interval: env_millis("FOLDMON_POLL_INTERVAL_MS")?
                .unwrap_or(defaults.poll_interval),
            read_buffer_size: env_usize("FOLDMON_READ_BUFFER")?
                .unwrap_or(defaults.read_buffer_size),
            event_capacity: env_usize("FOLDMON_EVENT_CAPACITY")?
                .unwrap_or(defaults.event_capacity),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the connection cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::Config("connect timeout must be non-zero".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be non-zero".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config("read buffer size must be non-zero".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event capacity must be non-zero".into()));
        }
        Ok(())
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the per-read buffer size.
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

fn env_millis(name: &str) -> Result<Option<Duration>> {
    Ok(env_usize(name)?.map(|ms| Duration::from_millis(ms as u64)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_connect_timeout(Duration::from_millis(250))
            .with_poll_interval(Duration::from_millis(10))
            .with_read_buffer_size(64)
            .with_event_capacity(8);

        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.read_buffer_size, 64);
        assert_eq!(config.event_capacity, 8);
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = ClientConfig::default().with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ClientConfig::default().with_read_buffer_size(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
