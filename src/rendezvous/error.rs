//! Rendezvous error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the rendezvous table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RendezvousError {
    /// The description type was neither `offer` nor `answer`.
    #[error("invalid session description type")]
    InvalidType,

    /// An answer arrived for a slot with no waiting offerer.
    #[error("no pending offer for slot")]
    NoPendingOffer,

    /// The offerer waited longer than the configured idle timeout.
    #[error("rendezvous expired after {0:?}")]
    Expired(Duration),

    /// The table was closed (broker shutting down).
    #[error("rendezvous table closed")]
    Closed,
}

impl RendezvousError {
    /// Metrics label for this error.
    pub fn label(&self) -> &'static str {
        match self {
            RendezvousError::InvalidType | RendezvousError::NoPendingOffer => "rejected",
            RendezvousError::Expired(_) => "expired",
            RendezvousError::Closed => "closed",
        }
    }
}
