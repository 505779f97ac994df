//! Slot rendezvous subsystem.
//!
//! # Data Flow
//! ```text
//! POST /{slot} {type, sdp}
//!     → message.rs (closed SdpType tag, opaque sdp)
//!     → table.rs resolve(key, message)
//!         key free,  offer  → insert Slot, return PendingAnswer (caller parks)
//!         key taken, offer  → return stored offer (no mutation)
//!         key taken, answer → remove Slot, fire its waker
//!         otherwise         → RendezvousError
//!     → PendingAnswer::wait() yields the answer to the parked offerer
//! ```
//!
//! # Slot States
//! ```text
//! Empty → AwaitingAnswer → Completed → (removed)
//!                        ↘ Abandoned / Expired / Closed → (removed)
//! ```
//!
//! # Design Decisions
//! - One mutex guards the whole table and is never held across an await
//! - Each slot owns a oneshot channel; the answer travels through it
//! - Dropping a PendingAnswer is the cancellation signal
//! - Slots carry a generation so late cleanup never touches a reused key

pub mod error;
pub mod message;
pub mod slot;
pub mod table;

pub use error::RendezvousError;
pub use message::{SdpType, SessionDescription};
pub use slot::{SlotKey, SlotKeyError};
pub use table::{Outcome, PendingAnswer, RendezvousTable, TableStats};
