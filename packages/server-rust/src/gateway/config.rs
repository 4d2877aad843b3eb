use std::time::Duration;

/// Gateway-level configuration applied to every synthesized route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Queue that process routes dispatch onto.
    pub queue: String,
    /// Upper bound on a single backend call. `None` waits indefinitely.
    pub dispatch_timeout: Option<Duration>,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            ..Self::default()
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            queue: "default".to_string(),
            dispatch_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.queue, "default");
        assert_eq!(config.dispatch_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn new_overrides_queue_only() {
        let config = GatewayConfig::new("orders");
        assert_eq!(config.queue, "orders");
        assert_eq!(config.dispatch_timeout, GatewayConfig::default().dispatch_timeout);
    }
}
