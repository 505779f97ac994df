//! minsig: a minimal WebRTC signalling broker.
//!
//! Two peers post session descriptions to the same slot path; the first
//! offer holds the slot until an answer arrives for it.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rendezvous;

pub use config::BrokerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rendezvous::{Outcome, RendezvousError, RendezvousTable, SessionDescription, SlotKey};
