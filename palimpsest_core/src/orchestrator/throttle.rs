//! Per-node minimum interval between refresh passes.

use chrono::{DateTime, Duration, Utc};
use palimpsest_rules::NodeId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PassThrottle {
    min_interval: Duration,
    last_pass: HashMap<NodeId, DateTime<Utc>>,
}

impl PassThrottle {
    /// Throttle allowing one pass per node every `min_interval_ms`.
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::milliseconds(i64::try_from(min_interval_ms).unwrap_or(i64::MAX)),
            last_pass: HashMap::new(),
        }
    }

    /// Whether a pass on `node_id` may run at `now`. Records the pass if so.
    pub fn allow(&mut self, node_id: &NodeId, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_pass.get(node_id) {
            if now.signed_duration_since(*last) < self.min_interval {
                return false;
            }
        }
        self.last_pass.insert(node_id.clone(), now);
        true
    }

    /// Forget every recorded pass.
    pub fn clear(&mut self) {
        self.last_pass.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_pass_within_interval_is_refused() {
        let mut throttle = PassThrottle::new(100);
        let node = NodeId::from("arch-discovery");
        let start = Utc::now();

        assert!(throttle.allow(&node, start));
        assert!(!throttle.allow(&node, start + Duration::milliseconds(50)));
        assert!(throttle.allow(&node, start + Duration::milliseconds(100)));
    }

    #[test]
    fn test_nodes_are_throttled_independently() {
        let mut throttle = PassThrottle::new(100);
        let now = Utc::now();
        assert!(throttle.allow(&NodeId::from("a"), now));
        assert!(throttle.allow(&NodeId::from("b"), now));
    }

    #[test]
    fn test_zero_interval_never_throttles() {
        let mut throttle = PassThrottle::new(0);
        let node = NodeId::from("a");
        let now = Utc::now();
        assert!(throttle.allow(&node, now));
        assert!(throttle.allow(&node, now));
    }
}
