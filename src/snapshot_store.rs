// Latest published snapshot, shared between the poller (sole writer) and any number of readers.
// Publishing swaps the whole Arc; a snapshot already handed out is never touched again.

use std::sync::Arc;
use tokio::sync::watch;

use crate::models::NetworkSnapshot;

pub struct SnapshotStore {
    tx: watch::Sender<Arc<NetworkSnapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Starts out holding [`NetworkSnapshot::empty`] (cycle 0, every field unavailable).
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(NetworkSnapshot::empty()));
        Self { tx }
    }

    /// Current snapshot. Only clones an `Arc`; never waits on the writer beyond that.
    pub fn get_snapshot(&self) -> Arc<NetworkSnapshot> {
        self.tx.borrow().clone()
    }

    /// Replaces the current snapshot and wakes subscribers. Returns the previous one.
    pub fn publish(&self, snapshot: NetworkSnapshot) -> Arc<NetworkSnapshot> {
        self.tx.send_replace(Arc::new(snapshot))
    }

    /// Change notifications for push consumers (WebSocket streams, archivers).
    pub fn subscribe(&self) -> watch::Receiver<Arc<NetworkSnapshot>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
