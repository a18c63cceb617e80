//! Durable FIFO of pending combination submissions.

use crate::{Combination, OutboxError, OutboxResult};
use kiosk_storage::KeyValueStorage;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key the pending queue is persisted under.
pub const QUEUE_STORAGE_KEY: &str = "combinations";

/// Durable, ordered queue of combinations awaiting delivery.
///
/// The in-memory deque is the working copy; every mutation rewrites the full
/// queue to its storage slot so pending submissions survive restarts. Queue
/// depth stays small in practice, so the full rewrite per mutation is the
/// simplicity/durability trade-off we accept.
pub struct CombinationQueue {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    pending: VecDeque<Combination>,
}

impl CombinationQueue {
    /// Load the persisted queue from storage under [`QUEUE_STORAGE_KEY`].
    pub fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::load_with_key(storage, QUEUE_STORAGE_KEY)
    }

    /// Load the persisted queue from a custom storage key.
    ///
    /// A missing, unreadable or malformed slot is treated as "no pending
    /// work": loading never fails, so a corrupt store cannot block startup.
    pub fn load_with_key(storage: Arc<dyn KeyValueStorage>, key: &str) -> Self {
        let pending = match storage.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<VecDeque<Combination>>(&raw) {
                Ok(pending) => pending,
                Err(err) => {
                    warn!(key, error = %err, "Malformed queue snapshot, starting empty");
                    VecDeque::new()
                }
            },
            Ok(None) => VecDeque::new(),
            Err(err) => {
                warn!(key, error = %err, "Storage read failed, starting empty");
                VecDeque::new()
            }
        };

        debug!(key, pending = pending.len(), "Loaded combination queue");

        Self {
            storage,
            key: key.to_string(),
            pending,
        }
    }

    /// Append a combination to the tail and persist the queue.
    ///
    /// Persistence is best-effort: if the write fails the in-memory queue
    /// still holds the record and delivery proceeds, at the cost of losing
    /// it on a restart before the next successful write.
    pub fn append(&mut self, combination: Combination) {
        self.pending.push_back(combination);
        self.persist();
    }

    /// Remove and return the head after a confirmed delivery.
    ///
    /// Calling this on an empty queue is a caller bug and fails with
    /// [`OutboxError::EmptyQueue`].
    pub fn remove_first(&mut self) -> OutboxResult<Combination> {
        let head = self.pending.pop_front().ok_or(OutboxError::EmptyQueue)?;
        self.persist();
        Ok(head)
    }

    /// The head of the queue, if any.
    pub fn peek_first(&self) -> Option<&Combination> {
        self.pending.front()
    }

    /// Number of pending combinations.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the queue has no pending combinations.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.pending) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %self.key, error = %err, "Failed to serialize queue");
                return;
            }
        };

        if let Err(err) = self.storage.set(&self.key, &raw) {
            warn!(key = %self.key, error = %err, "Failed to persist queue, keeping in-memory state");
        }
    }
}
