//! Flotilla Profiles - Resource profiles
//!
//! A profile turns a validated specification into lifecycle calls against a
//! compute backend. This crate provides:
//!
//! - **Profile**: the per-resource-type behaviour set
//! - **ProfileLifecycle**: drives one node through validate, create, update,
//!   check, details and delete, keeping its status in step
//! - **ProfileRegistry**: resolves resource type names to profiles
//! - **ServerProfile**: the `os.nova.server` resource type
//!
//! ## Lifecycle
//!
//! ```text
//! UNVALIDATED -> VALIDATED -> CREATING -> ACTIVE -> UPDATING -> ACTIVE
//!                                           \-> DELETING -> DELETED
//! ```
//!
//! A failed backend call moves the node to ERROR and the failure is returned
//! unwrapped. Nothing is retried here.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod lifecycle;
pub mod profile;
pub mod registry;
pub mod server;

pub use error::{ProfileError, Result};
pub use lifecycle::ProfileLifecycle;
pub use profile::Profile;
pub use registry::{ProfileBuilder, ProfileEnv, ProfileRegistry};
pub use server::{ServerProfile, SERVER_PROFILE_TYPE};
