use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

/// Outbound half of a live connection: encoded frames queued for its writer.
pub type ConnectionSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone)]
struct ConnectionEntry {
    connection_id: u64,
    sender: ConnectionSender,
}

/// Live connections keyed by participant identity.
///
/// Cloning is cheap and every clone sees the same set of connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<String, ConnectionEntry>>,
    next_connection_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `identity`, replacing any previous connection under the same
    /// identity. The entry lives as long as the returned lease.
    pub fn register(&self, identity: &str, sender: ConnectionSender) -> ConnectionLease {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let entry = ConnectionEntry {
            connection_id,
            sender,
        };

        if self
            .connections
            .insert(identity.to_string(), entry)
            .is_some()
        {
            tracing::info!(identity = %identity, "Connection replaced by reconnect");
        } else {
            tracing::debug!(identity = %identity, "Connection registered");
        }

        ConnectionLease {
            registry: self.clone(),
            identity: identity.to_string(),
            connection_id,
        }
    }

    pub fn unregister(&self, identity: &str) {
        if self.connections.remove(identity).is_some() {
            tracing::debug!(identity = %identity, "Connection unregistered");
        }
    }

    fn release(&self, identity: &str, connection_id: u64) {
        let removed = self
            .connections
            .remove_if(identity, |_, entry| entry.connection_id == connection_id);
        if removed.is_some() {
            tracing::debug!(identity = %identity, "Connection released");
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Identities connected right now.
    pub fn identities(&self) -> Vec<String> {
        let mut identities = Vec::with_capacity(self.len());
        self.for_each(|identity, _| identities.push(identity.to_string()));
        identities
    }

    /// Calls `f` for every connection in a snapshot taken up front, so `f`
    /// may use the registry freely.
    pub fn for_each(&self, mut f: impl FnMut(&str, &ConnectionSender)) {
        let snapshot: Vec<(String, ConnectionSender)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().sender.clone()))
            .collect();

        for (identity, sender) in &snapshot {
            f(identity, sender);
        }
    }

    /// Queues `message` for `identity`. Offline recipients are skipped; there
    /// is no queueing for later delivery.
    pub fn send(&self, identity: &str, message: &str) {
        let Some(sender) = self
            .connections
            .get(identity)
            .map(|entry| entry.sender.clone())
        else {
            tracing::trace!(identity = %identity, "Recipient offline, message dropped");
            return;
        };

        if sender.send(message.to_string()).is_err() {
            tracing::warn!(identity = %identity, "Connection writer gone, message dropped");
        }
    }
}

/// Keeps a registry entry alive. Dropping it removes the entry unless a
/// newer connection has taken over the identity.
#[derive(Debug)]
pub struct ConnectionLease {
    registry: ConnectionRegistry,
    identity: String,
    connection_id: u64,
}

impl ConnectionLease {
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.registry.release(&self.identity, self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_reaches_only_the_named_identity() {
        let registry = ConnectionRegistry::new();
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        let _a = registry.register("A", a_tx);
        let _b = registry.register("B", b_tx);

        registry.send("A", "hi");
        registry.send("nobody", "lost");

        assert_eq!(a_rx.try_recv().unwrap(), "hi");
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn reconnect_replaces_and_stale_lease_keeps_new_entry() {
        let registry = ConnectionRegistry::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        let old_lease = registry.register("A", old_tx);
        let _new_lease = registry.register("A", new_tx);
        assert_eq!(registry.len(), 1);

        drop(old_lease);
        assert_eq!(registry.identities(), vec!["A".to_string()]);

        registry.send("A", "after reconnect");
        assert_eq!(new_rx.try_recv().unwrap(), "after reconnect");
        assert!(old_rx.try_recv().is_err());
    }

    #[test]
    fn dropping_the_lease_unregisters() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let lease = registry.register("A", tx);
        assert_eq!(lease.identity(), "A");

        drop(lease);
        assert!(registry.is_empty());
    }

    #[test]
    fn for_each_visits_a_snapshot() {
        let registry = ConnectionRegistry::new();
        let (a_tx, _a_rx) = mpsc::unbounded_channel();
        let (b_tx, _b_rx) = mpsc::unbounded_channel();
        let _a = registry.register("A", a_tx);
        let _b = registry.register("B", b_tx);

        let mut seen = Vec::new();
        registry.for_each(|identity, _| {
            seen.push(identity.to_string());
            registry.unregister(identity);
        });
        seen.sort();

        assert_eq!(seen, vec!["A".to_string(), "B".to_string()]);
        assert!(registry.is_empty());
    }
}
