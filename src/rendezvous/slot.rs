//! Slot keys and per-slot state.

use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::rendezvous::message::SessionDescription;

/// Default cap on slot key length, in bytes.
pub const DEFAULT_MAX_SLOT_KEY_LEN: usize = 255;

/// Reasons a slot key is refused by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotKeyError {
    #[error("slot key is empty")]
    Empty,

    #[error("slot key is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Name of a rendezvous slot, shared out of band by both parties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey(String);

impl SlotKey {
    /// Validate a raw key against the length cap.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, SlotKeyError> {
        if raw.is_empty() {
            return Err(SlotKeyError::Empty);
        }
        if raw.len() > max_len {
            return Err(SlotKeyError::TooLong {
                len: raw.len(),
                max: max_len,
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for SlotKey {
    type Error = SlotKeyError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw, DEFAULT_MAX_SLOT_KEY_LEN)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An in-flight rendezvous: an offer waiting for its answer.
///
/// Owned by the table. Removing it from the table and firing `waker`
/// happen in the same critical section.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) offer: SessionDescription,
    pub(crate) waker: oneshot::Sender<SessionDescription>,
    pub(crate) generation: u64,
    pub(crate) created_at: Instant,
}

impl Slot {
    pub(crate) fn new(
        offer: SessionDescription,
        waker: oneshot::Sender<SessionDescription>,
        generation: u64,
    ) -> Self {
        Self {
            offer,
            waker,
            generation,
            created_at: Instant::now(),
        }
    }

    /// Hand the answer to the parked offerer.
    ///
    /// Returns the answer back if the offerer is already gone.
    pub(crate) fn complete(self, answer: SessionDescription) -> Result<(), SessionDescription> {
        self.waker.send(answer)
    }
}
