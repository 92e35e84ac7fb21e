#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use super::{Drained, MailboxStore, StoreError};
use crate::{
    env::Timestamp,
    envelope::{Envelope, EnvelopeId},
};

type Queue = VecDeque<Envelope>;
type MailboxHandle = Arc<Mutex<Queue>>;

/// In-memory mailbox store with one mutex per recipient.
///
/// The recipient map sits behind a `RwLock` and hands out `Arc` handles to
/// per-recipient queues. The map lock is always released before a queue lock
/// is taken, so no caller ever holds two locks at once. Mailboxes are never
/// removed from the map, which means a handle cloned out of it always refers
/// to the live queue.
///
/// Poisoned locks are recovered: every queue mutation is a single call
/// (`push_back`, `mem::take`, `retain`) that leaves the queue consistent even
/// if another thread panicked while holding the lock.
#[derive(Clone, Default)]
pub struct MemoryMailboxStore {
    mailboxes: Arc<RwLock<HashMap<String, MailboxHandle>>>,
}

impl MemoryMailboxStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mailboxes created so far (empty ones included).
    pub fn mailbox_count(&self) -> usize {
        self.mailboxes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of envelopes queued for one recipient.
    pub fn queued_for(&self, recipient: &str) -> usize {
        self.mailbox(recipient).map_or(0, |handle| lock(&handle).len())
    }

    fn mailbox(&self, recipient: &str) -> Option<MailboxHandle> {
        let mailboxes = self.mailboxes.read().unwrap_or_else(PoisonError::into_inner);
        mailboxes.get(recipient).cloned()
    }

    fn mailbox_or_create(&self, recipient: &str) -> MailboxHandle {
        if let Some(handle) = self.mailbox(recipient) {
            return handle;
        }

        // Another writer may have created it between the read and this write;
        // `entry` keeps whichever got there first.
        let mut mailboxes = self.mailboxes.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(mailboxes.entry(recipient.to_owned()).or_default())
    }

    fn handles(&self) -> Vec<MailboxHandle> {
        let mailboxes = self.mailboxes.read().unwrap_or_else(PoisonError::into_inner);
        mailboxes.values().cloned().collect()
    }
}

fn lock(handle: &Mutex<Queue>) -> MutexGuard<'_, Queue> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MailboxStore for MemoryMailboxStore {
    fn append_with<F>(&self, recipient: &str, build: F) -> Result<EnvelopeId, StoreError>
    where
        F: FnOnce() -> Envelope,
    {
        let handle = self.mailbox_or_create(recipient);
        let mut queue = lock(&handle);
        let envelope = build();
        let id = envelope.id;
        queue.push_back(envelope);
        Ok(id)
    }

    fn drain_deliverable(&self, recipient: &str, now: Timestamp) -> Result<Drained, StoreError> {
        let Some(handle) = self.mailbox(recipient) else {
            return Ok(Drained::default());
        };

        // The swap is the whole critical section; partitioning happens on the
        // owned snapshot.
        let queue = std::mem::take(&mut *lock(&handle));

        let mut drained = Drained { deliverable: Vec::with_capacity(queue.len()), expired: 0 };
        for envelope in queue {
            if envelope.is_expired(now) {
                drained.expired += 1;
            } else {
                drained.deliverable.push(envelope);
            }
        }

        Ok(drained)
    }

    fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError> {
        let mut removed = 0;

        for handle in self.handles() {
            let mut queue = lock(&handle);
            let before = queue.len();
            queue.retain(|envelope| !envelope.is_expired(now));
            removed += before - queue.len();
        }

        Ok(removed)
    }

    fn pending_count(&self) -> Result<usize, StoreError> {
        Ok(self.handles().iter().map(|handle| lock(handle).len()).sum())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn envelope(sequence: u64, expire_at: Option<u64>) -> Envelope {
        Envelope {
            id: EnvelopeId::new(Timestamp::from_millis(1_000), sequence),
            sender: "alice".to_string(),
            ciphertext: Bytes::from(sequence.to_be_bytes().to_vec()),
            created_at: Timestamp::from_millis(1_000),
            expire_at: expire_at.map(Timestamp::from_millis),
        }
    }

    fn sequences(envelopes: &[Envelope]) -> Vec<u64> {
        envelopes.iter().map(|e| e.id.sequence()).collect()
    }

    #[test]
    fn new_store_is_empty() {
        let store = MemoryMailboxStore::new();
        assert_eq!(store.mailbox_count(), 0);
        assert_eq!(store.pending_count().unwrap(), 0);
    }

    #[test]
    fn append_creates_mailbox_lazily() {
        let store = MemoryMailboxStore::new();
        store.append("bob", envelope(0, None)).unwrap();

        assert_eq!(store.mailbox_count(), 1);
        assert_eq!(store.queued_for("bob"), 1);
    }

    #[test]
    fn append_with_returns_built_id() {
        let store = MemoryMailboxStore::new();

        let id = store.append_with("bob", || envelope(9, None)).unwrap();

        assert_eq!(id, EnvelopeId::new(Timestamp::from_millis(1_000), 9));
        assert_eq!(store.queued_for("bob"), 1);
    }

    #[test]
    fn drain_returns_insertion_order() {
        let store = MemoryMailboxStore::new();
        for i in 0..5 {
            store.append("bob", envelope(i, None)).unwrap();
        }

        let drained = store.drain_deliverable("bob", Timestamp::from_millis(2_000)).unwrap();
        assert_eq!(sequences(&drained.deliverable), vec![0, 1, 2, 3, 4]);
        assert_eq!(drained.expired, 0);
    }

    #[test]
    fn second_drain_is_empty() {
        let store = MemoryMailboxStore::new();
        store.append("bob", envelope(0, None)).unwrap();

        let now = Timestamp::from_millis(2_000);
        assert_eq!(store.drain_deliverable("bob", now).unwrap().deliverable.len(), 1);
        assert!(store.drain_deliverable("bob", now).unwrap().deliverable.is_empty());
    }

    #[test]
    fn drain_keeps_emptied_mailbox() {
        let store = MemoryMailboxStore::new();
        store.append("bob", envelope(0, None)).unwrap();
        store.drain_deliverable("bob", Timestamp::from_millis(2_000)).unwrap();

        assert_eq!(store.mailbox_count(), 1);
        assert_eq!(store.queued_for("bob"), 0);
    }

    #[test]
    fn drain_unknown_recipient_does_not_create_mailbox() {
        let store = MemoryMailboxStore::new();

        let drained = store.drain_deliverable("nobody", Timestamp::from_millis(0)).unwrap();

        assert_eq!(drained, Drained::default());
        assert_eq!(store.mailbox_count(), 0);
    }

    #[test]
    fn drain_discards_expired_envelopes() {
        let store = MemoryMailboxStore::new();
        store.append("bob", envelope(0, Some(1_500))).unwrap();
        store.append("bob", envelope(1, None)).unwrap();
        store.append("bob", envelope(2, Some(2_000))).unwrap();
        store.append("bob", envelope(3, Some(2_001))).unwrap();

        let drained = store.drain_deliverable("bob", Timestamp::from_millis(2_000)).unwrap();

        assert_eq!(sequences(&drained.deliverable), vec![1, 3]);
        assert_eq!(drained.expired, 2);
        assert_eq!(store.queued_for("bob"), 0);
    }

    #[test]
    fn purge_removes_only_expired() {
        let store = MemoryMailboxStore::new();
        store.append("bob", envelope(0, Some(1_500))).unwrap();
        store.append("bob", envelope(1, None)).unwrap();
        store.append("carol", envelope(2, Some(1_200))).unwrap();
        store.append("carol", envelope(3, Some(9_000))).unwrap();

        let removed = store.purge_expired(Timestamp::from_millis(2_000)).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.pending_count().unwrap(), 2);

        let now = Timestamp::from_millis(2_000);
        assert_eq!(sequences(&store.drain_deliverable("bob", now).unwrap().deliverable), vec![1]);
        assert_eq!(
            sequences(&store.drain_deliverable("carol", now).unwrap().deliverable),
            vec![3]
        );
    }

    #[test]
    fn purge_on_empty_store_is_noop() {
        let store = MemoryMailboxStore::new();
        assert_eq!(store.purge_expired(Timestamp::from_millis(u64::MAX)).unwrap(), 0);
    }

    #[test]
    fn clone_shares_state() {
        let store1 = MemoryMailboxStore::new();
        let store2 = store1.clone();

        store1.append("bob", envelope(7, None)).unwrap();

        let drained = store2.drain_deliverable("bob", Timestamp::from_millis(2_000)).unwrap();
        assert_eq!(sequences(&drained.deliverable), vec![7]);
        assert_eq!(store1.queued_for("bob"), 0);
    }

    #[test]
    fn recipients_are_isolated() {
        let store = MemoryMailboxStore::new();
        store.append("bob", envelope(0, None)).unwrap();
        store.append("carol", envelope(1, None)).unwrap();

        store.drain_deliverable("bob", Timestamp::from_millis(2_000)).unwrap();

        assert_eq!(store.queued_for("carol"), 1);
    }

    #[test]
    fn poisoned_mailbox_is_recovered() {
        let store = MemoryMailboxStore::new();
        store.append("bob", envelope(0, None)).unwrap();

        let handle = store.mailbox("bob").unwrap();
        let _ = std::thread::spawn(move || {
            let _guard = handle.lock().unwrap();
            std::panic::panic_any("poison the mailbox");
        })
        .join();

        store.append("bob", envelope(1, None)).unwrap();
        let drained = store.drain_deliverable("bob", Timestamp::from_millis(2_000)).unwrap();
        assert_eq!(sequences(&drained.deliverable), vec![0, 1]);
    }
}
