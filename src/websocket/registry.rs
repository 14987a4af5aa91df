use super::codec::Command;

/// Active subscriptions, at most one per method, in registration order.
///
/// The registry never touches the socket; whoever adds an entry is
/// responsible for sending it.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    entries: Vec<Command>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command`, replacing any entry with the same method.
    pub fn add(&mut self, command: Command) {
        self.remove(&command.method);
        self.entries.push(command);
    }

    /// Removes every entry for `method`. Absent methods are ignored.
    pub fn remove(&mut self, method: &str) {
        self.entries.retain(|entry| entry.method != method);
    }

    /// Entries in insertion order, as they are replayed after a reconnect.
    pub fn snapshot(&self) -> Vec<Command> {
        self.entries.clone()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.entries.iter().any(|entry| entry.method == method)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn sub(id: i64, method: &str, params: Vec<serde_json::Value>) -> Command {
        Command::new(id, method, params)
    }

    #[test]
    fn test_resubscribe_replaces_entry() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub(1, "deals_subscribe", vec![json!(["BTC_USDT"])]));
        registry.add(sub(2, "deals_subscribe", vec![json!(["ETH_USDT"])]));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, 2);
        assert_eq!(snapshot[0].params, vec![json!(["ETH_USDT"])]);
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub(1, "depth_subscribe", vec![]));
        registry.add(sub(2, "candles_subscribe", vec![]));
        registry.add(sub(3, "trades_subscribe", vec![]));

        let methods: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|c| c.method)
            .collect();
        assert_eq!(
            methods,
            vec!["depth_subscribe", "candles_subscribe", "trades_subscribe"]
        );
    }

    #[test]
    fn test_replaced_entry_moves_to_end() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub(1, "a_subscribe", vec![]));
        registry.add(sub(2, "b_subscribe", vec![]));
        registry.add(sub(3, "a_subscribe", vec![]));

        let ids: Vec<_> = registry.snapshot().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub(1, "deals_subscribe", vec![]));
        registry.remove("candles_subscribe");
        assert_eq!(registry.len(), 1);

        registry.remove("deals_subscribe");
        assert!(registry.is_empty());
        assert!(!registry.contains("deals_subscribe"));
    }

    #[test]
    fn test_one_entry_per_method_over_mixed_sequence() {
        let methods = ["a_subscribe", "b_subscribe", "c_subscribe"];
        let mut registry = SubscriptionRegistry::new();

        // deterministic pseudo-random walk over add/remove
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for step in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let method = methods[(seed % 3) as usize];
            if seed % 4 == 0 {
                registry.remove(method);
                assert!(!registry.contains(method));
            } else {
                registry.add(sub(step, method, vec![json!(step)]));
                let latest = registry
                    .snapshot()
                    .into_iter()
                    .find(|c| c.method == method)
                    .unwrap();
                assert_eq!(latest.id, step);
            }

            let snapshot = registry.snapshot();
            let unique: HashSet<_> = snapshot.iter().map(|c| c.method.clone()).collect();
            assert_eq!(unique.len(), snapshot.len());
        }
    }
}
