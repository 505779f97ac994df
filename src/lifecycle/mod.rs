//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → close rendezvous table (parked offerers get 503)
//!             → stop accepting → drain connections → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
