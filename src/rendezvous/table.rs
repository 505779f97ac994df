//! The rendezvous table.
//!
//! Maps slot keys to in-flight slots behind a single mutex. Every map read
//! and write happens inside that critical section; the only suspension is
//! the offerer awaiting its oneshot receiver, which happens outside it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::observability::metrics;
use crate::rendezvous::error::RendezvousError;
use crate::rendezvous::message::{SdpType, SessionDescription};
use crate::rendezvous::slot::{Slot, SlotKey};

/// Result of submitting a description to a slot.
#[derive(Debug)]
pub enum Outcome {
    /// The slot was free and now holds this offer. Await the answer.
    Offerer(PendingAnswer),
    /// The slot was taken; this is the offer stored there.
    Reflected(SessionDescription),
    /// The answer was handed to the waiting offerer.
    Delivered,
}

impl Outcome {
    /// Metrics label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Offerer(_) => "offerer",
            Outcome::Reflected(_) => "reflected",
            Outcome::Delivered => "delivered",
        }
    }
}

/// Point-in-time view of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Slots currently waiting for an answer.
    pub open_slots: usize,
    /// Whether the table has been closed.
    pub closed: bool,
    /// How long the oldest open slot has been waiting.
    pub oldest_wait: Option<Duration>,
}

#[derive(Debug, Default)]
struct TableState {
    slots: HashMap<SlotKey, Slot>,
    closed: bool,
    next_generation: u64,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TableState>,
    idle_timeout: Option<Duration>,
}

/// Concurrent table of in-flight rendezvous.
///
/// Cloning is cheap and yields a handle to the same table.
#[derive(Debug, Clone)]
pub struct RendezvousTable {
    shared: Arc<Shared>,
}

impl RendezvousTable {
    /// Create an empty table with no idle timeout.
    pub fn new() -> Self {
        Self::with_idle_timeout(None)
    }

    /// Create an empty table whose offerers give up after `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TableState::default()),
                idle_timeout,
            }),
        }
    }

    /// Submit a description to a slot.
    ///
    /// Never blocks. When the caller becomes the offerer it receives a
    /// [`PendingAnswer`]; awaiting it is the only long-lived part of a
    /// rendezvous, and dropping it abandons the slot.
    pub fn resolve(
        &self,
        key: SlotKey,
        message: SessionDescription,
    ) -> Result<Outcome, RendezvousError> {
        let result = self.resolve_locked(key, message);
        match &result {
            Ok(outcome) => metrics::record_submission(outcome.label()),
            Err(e) => metrics::record_submission(e.label()),
        }
        result
    }

    fn resolve_locked(
        &self,
        key: SlotKey,
        message: SessionDescription,
    ) -> Result<Outcome, RendezvousError> {
        let mut state = self.lock();
        if state.closed {
            return Err(RendezvousError::Closed);
        }

        match message.kind {
            SdpType::Offer => {
                if let Some(slot) = state.slots.get(&key) {
                    tracing::debug!(slot = %key, "Slot taken, reflecting stored offer");
                    return Ok(Outcome::Reflected(slot.offer.clone()));
                }

                let generation = state.next_generation;
                state.next_generation += 1;

                let (waker, receiver) = oneshot::channel();
                state
                    .slots
                    .insert(key.clone(), Slot::new(message, waker, generation));
                metrics::set_open_slots(state.slots.len());
                tracing::debug!(slot = %key, generation, "Slot opened");

                Ok(Outcome::Offerer(PendingAnswer {
                    table: self.clone(),
                    key,
                    generation,
                    receiver,
                    opened_at: Instant::now(),
                    settled: false,
                }))
            }
            SdpType::Answer => {
                let slot = match state.slots.remove(&key) {
                    Some(slot) => slot,
                    None => {
                        tracing::debug!(slot = %key, "Answer without pending offer");
                        return Err(RendezvousError::NoPendingOffer);
                    }
                };
                metrics::set_open_slots(state.slots.len());

                match slot.complete(message) {
                    Ok(()) => {
                        tracing::debug!(slot = %key, "Answer delivered");
                        Ok(Outcome::Delivered)
                    }
                    Err(_) => {
                        // Offerer dropped its receiver but has not reached
                        // its own cleanup yet.
                        tracing::debug!(slot = %key, "Offerer vanished before answer");
                        Err(RendezvousError::NoPendingOffer)
                    }
                }
            }
            SdpType::Other => Err(RendezvousError::InvalidType),
        }
    }

    /// Close the table: wake every parked offerer with
    /// [`RendezvousError::Closed`] and refuse further submissions.
    pub fn close(&self) {
        let drained: Vec<Slot> = {
            let mut state = self.lock();
            state.closed = true;
            state.slots.drain().map(|(_, slot)| slot).collect()
        };
        metrics::set_open_slots(0);
        tracing::info!(released = drained.len(), "Rendezvous table closed");
        // Dropping the wakers wakes the receivers.
        drop(drained);
    }

    /// Number of slots waiting for an answer.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` currently holds an offer.
    pub fn contains(&self, key: &SlotKey) -> bool {
        self.lock().slots.contains_key(key)
    }

    pub fn stats(&self) -> TableStats {
        let state = self.lock();
        TableStats {
            open_slots: state.slots.len(),
            closed: state.closed,
            oldest_wait: state
                .slots
                .values()
                .map(|slot| slot.created_at.elapsed())
                .max(),
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.shared.idle_timeout
    }

    /// Remove `key` only if it still holds the slot stamped `generation`.
    fn remove_generation(&self, key: &SlotKey, generation: u64) -> bool {
        let mut state = self.lock();
        let owned = state
            .slots
            .get(key)
            .is_some_and(|slot| slot.generation == generation);
        if owned {
            state.slots.remove(key);
            metrics::set_open_slots(state.slots.len());
        }
        owned
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        // Nothing panics while the lock is held, so a poisoned state is
        // still consistent.
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RendezvousTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The offerer's side of an open slot.
///
/// Dropping it before the answer arrives removes the slot, so the key is
/// immediately reusable.
pub struct PendingAnswer {
    table: RendezvousTable,
    key: SlotKey,
    generation: u64,
    receiver: oneshot::Receiver<SessionDescription>,
    opened_at: Instant,
    settled: bool,
}

impl PendingAnswer {
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    /// Park until the answer arrives.
    ///
    /// Fails with [`RendezvousError::Expired`] when the table's idle timeout
    /// elapses first, and with [`RendezvousError::Closed`] when the table is
    /// closed.
    pub async fn wait(mut self) -> Result<SessionDescription, RendezvousError> {
        let received = match self.table.idle_timeout() {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, &mut self.receiver).await;
                match waited {
                    Ok(received) => received,
                    Err(_) => return self.expire(limit),
                }
            }
            None => (&mut self.receiver).await,
        };

        self.settled = true;
        match received {
            Ok(answer) => {
                metrics::record_rendezvous("completed", self.opened_at.elapsed());
                Ok(answer)
            }
            Err(_) => {
                metrics::record_rendezvous("closed", self.opened_at.elapsed());
                Err(RendezvousError::Closed)
            }
        }
    }

    fn expire(&mut self, limit: Duration) -> Result<SessionDescription, RendezvousError> {
        self.settled = true;
        if self.table.remove_generation(&self.key, self.generation) {
            tracing::debug!(slot = %self.key, "Slot expired");
            metrics::record_rendezvous("expired", self.opened_at.elapsed());
            return Err(RendezvousError::Expired(limit));
        }

        // The slot is already gone: an answer won the race against the
        // timer, or the table was closed.
        match self.receiver.try_recv() {
            Ok(answer) => {
                metrics::record_rendezvous("completed", self.opened_at.elapsed());
                Ok(answer)
            }
            Err(_) => {
                metrics::record_rendezvous("closed", self.opened_at.elapsed());
                Err(RendezvousError::Closed)
            }
        }
    }
}

impl Drop for PendingAnswer {
    fn drop(&mut self) {
        if let Some(result) = self.abandon() {
            tracing::debug!(slot = %self.key, result, "Offerer left before reading the answer");
            metrics::record_rendezvous(result, self.opened_at.elapsed());
        }
    }
}

impl PendingAnswer {
    /// Settle an offerer that never finished `wait`, freeing its slot.
    /// Returns the metrics label for how the rendezvous ended, or `None` if
    /// it was already accounted for.
    fn abandon(&mut self) -> Option<&'static str> {
        if std::mem::replace(&mut self.settled, true) {
            return None;
        }
        if self.table.remove_generation(&self.key, self.generation) {
            return Some("abandoned");
        }
        // The slot is gone without our help: either the answer is sitting
        // unread in the channel or the table was closed.
        match self.receiver.try_recv() {
            Ok(_) => Some("abandoned"),
            Err(TryRecvError::Closed) => Some("closed"),
            Err(TryRecvError::Empty) => None,
        }
    }
}

impl fmt::Debug for PendingAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAnswer")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .field("settled", &self.settled)
            .finish()
    }
}
