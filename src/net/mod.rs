//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly with Tokio; this module only adds
//! what HTTPS needs on top.

pub mod tls;
