//! Shared per-application configuration aggregate.

use dashmap::DashMap;
use std::collections::HashMap;

/// Namespace → key/value aggregate for one application.
///
/// Ownership invariant: the aggregate is written by the application's fetch
/// workers and consumed by its single aggregator task. Each worker only
/// ever stores its own namespace key, so writes are disjoint; the map
/// container itself carries the concurrency so that stores, snapshots and
/// clears may overlap freely.
///
/// A namespace entry exists only after at least one successful fetch for
/// it, and is removed (per namespace, or via a whole-aggregate clear) only
/// once a successful write consumed it.
#[derive(Debug, Default)]
pub struct AppAggregate {
    entries: DashMap<String, HashMap<String, String>>,
}

impl AppAggregate {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Stores the latest snapshot for one namespace, replacing any previous
    /// value.
    pub fn store(&self, namespace: impl Into<String>, configs: HashMap<String, String>) {
        self.entries.insert(namespace.into(), configs);
    }

    /// Number of namespaces currently holding unconsumed data.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.entries.contains_key(namespace)
    }

    /// Removes one namespace's entry, returning it if present.
    pub fn remove(&self, namespace: &str) -> Option<HashMap<String, String>> {
        self.entries.remove(namespace).map(|(_, configs)| configs)
    }

    /// Drops every entry. Used after an all-in-one write consumed the whole
    /// aggregate.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Point-in-time copy of the aggregate for rendering.
    ///
    /// Stores racing with the snapshot land either in this copy or in the
    /// next one; both are correct since every write cycle re-reads.
    pub fn snapshot(&self) -> HashMap<String, HashMap<String, String>> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn kv(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_store_and_snapshot() {
        let aggregate = AppAggregate::new();
        aggregate.store("a.properties", kv(&[("k1", "v1")]));
        aggregate.store("b.yml", kv(&[("content", "x: 1")]));

        let snapshot = aggregate.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot["a.properties"].get("k1"),
            Some(&"v1".to_string())
        );
    }

    #[test]
    fn test_store_replaces_previous_value() {
        let aggregate = AppAggregate::new();
        aggregate.store("a.properties", kv(&[("k1", "v1")]));
        aggregate.store("a.properties", kv(&[("k1", "v2")]));

        assert_eq!(aggregate.len(), 1);
        let snapshot = aggregate.snapshot();
        assert_eq!(
            snapshot["a.properties"].get("k1"),
            Some(&"v2".to_string())
        );
    }

    #[test]
    fn test_remove_returns_entry() {
        let aggregate = AppAggregate::new();
        aggregate.store("a.properties", kv(&[("k1", "v1")]));

        let removed = aggregate.remove("a.properties");
        assert!(removed.is_some());
        assert!(aggregate.is_empty());
        assert!(aggregate.remove("a.properties").is_none());
    }

    #[test]
    fn test_clear_empties_all_namespaces() {
        let aggregate = AppAggregate::new();
        aggregate.store("a.properties", kv(&[("k1", "v1")]));
        aggregate.store("b.yml", kv(&[("content", "x")]));

        aggregate.clear();
        assert!(aggregate.is_empty());
        assert_eq!(aggregate.len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_stores() {
        // Workers write disjoint namespace keys concurrently; every key
        // must survive.
        let aggregate = Arc::new(AppAggregate::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let aggregate = Arc::clone(&aggregate);
            handles.push(tokio::spawn(async move {
                aggregate.store(format!("ns-{i}.properties"), kv(&[("k", "v")]));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(aggregate.len(), 8);
    }
}
