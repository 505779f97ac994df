//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → BrokerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the broker runs with no file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::BrokerConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RendezvousConfig;
pub use schema::TlsConfig;
