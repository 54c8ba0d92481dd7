//! Transport configuration

/// Topic name used when none is configured
pub const DEFAULT_TRANSPORT_NAME: &str = "sensors";

/// Simulated at-least-once behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedeliveryPolicy {
    /// Each message is delivered once
    #[default]
    Never,
    /// Every n-th published message is delivered a second time
    EveryNth(u64),
}

impl RedeliveryPolicy {
    /// Whether the message with this (1-based) sequence gets a duplicate
    pub fn redeliver(&self, sequence: u64) -> bool {
        match *self {
            Self::Never => false,
            Self::EveryNth(0) => false,
            Self::EveryNth(n) => sequence % n == 0,
        }
    }
}

/// Memory transport configuration
#[derive(Debug, Clone)]
pub struct MemoryTransportConfig {
    /// Topic name, shown in logs
    pub name: String,

    /// Buffered messages before publishes start failing
    pub capacity: usize,

    pub redelivery: RedeliveryPolicy,
}

impl Default for MemoryTransportConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TRANSPORT_NAME.to_string(),
            capacity: 1024,
            redelivery: RedeliveryPolicy::Never,
        }
    }
}

impl MemoryTransportConfig {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            ..Default::default()
        }
    }

    pub fn with_redelivery(mut self, redelivery: RedeliveryPolicy) -> Self {
        self.redelivery = redelivery;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redelivery_policy() {
        assert!(!RedeliveryPolicy::Never.redeliver(1));
        assert!(!RedeliveryPolicy::EveryNth(0).redeliver(3));

        let every_third = RedeliveryPolicy::EveryNth(3);
        let hits: Vec<u64> = (1..=9).filter(|s| every_third.redeliver(*s)).collect();
        assert_eq!(hits, vec![3, 6, 9]);
    }

    #[test]
    fn test_default_config() {
        let config = MemoryTransportConfig::default();
        assert_eq!(config.name, "sensors");
        assert_eq!(config.redelivery, RedeliveryPolicy::Never);
    }
}
