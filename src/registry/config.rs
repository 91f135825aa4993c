//! Registry configuration

use std::time::Duration;

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long an output may take to connect before the target errors
    pub connect_timeout: Duration,

    /// How long shutdown waits for each output to disconnect
    pub stop_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set stop timeout
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.stop_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_pattern() {
        let config = RegistryConfig::new()
            .connect_timeout(Duration::from_secs(3))
            .stop_timeout(Duration::from_millis(500));

        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.stop_timeout, Duration::from_millis(500));
    }
}
