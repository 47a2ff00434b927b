//! Flotilla Config - Engine configuration
//!
//! [`EngineConfig`] is read once at startup and then shared, immutable, by
//! `Arc` with every profile and receiver. Nothing in the engine reads
//! process-wide configuration after construction.
//!
//! Sources are layered: built-in defaults, an optional file, then
//! `FLOTILLA_` environment variables, where nested keys use a double
//! underscore (`FLOTILLA_RECEIVER__PORT=9000`).

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod logging;
pub mod settings;

pub use error::{ConfigError, Result};
pub use logging::LoggingConfig;
pub use settings::{
    AuthenticationConfig, EngineConfig, EngineSection, OrphanQueuePolicy, ProfileConfig,
    ReceiverConfig, TrusteeConfig,
};
