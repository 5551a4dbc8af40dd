//! Router configuration

/// Router configuration options
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Initial capacity of the publisher endpoint store
    pub publisher_capacity: usize,

    /// Initial capacity of the subscriber endpoint store
    pub subscriber_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            publisher_capacity: 16,
            subscriber_capacity: 16,
        }
    }
}

impl RouterConfig {
    /// Set the initial publisher store capacity
    pub fn publisher_capacity(mut self, capacity: usize) -> Self {
        self.publisher_capacity = capacity;
        self
    }

    /// Set the initial subscriber store capacity
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();

        assert_eq!(config.publisher_capacity, 16);
        assert_eq!(config.subscriber_capacity, 16);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RouterConfig::default()
            .publisher_capacity(4)
            .subscriber_capacity(64);

        assert_eq!(config.publisher_capacity, 4);
        assert_eq!(config.subscriber_capacity, 64);
    }
}
