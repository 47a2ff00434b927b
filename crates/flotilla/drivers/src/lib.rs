//! Flotilla Drivers - Backend capability contracts
//!
//! Profiles and receivers never talk to a cloud API directly. They consume
//! three capability traits:
//!
//! - **ComputeDriver**: physical resources (servers) and the resources they
//!   reference (images, flavors)
//! - **MessageDriver**: queues and subscriptions on a message bus
//! - **IdentityDriver**: trusts and the service catalog, plus a
//!   **SessionResolver** for service identities
//!
//! A [`DriverFactory`] builds per-owner client handles from
//! [`ConnectionParams`]. Which factory is used is decided once, from static
//! configuration, when the engine is assembled ([`BackendKind`]).
//!
//! [`ClientCache`] memoizes one client per owning profile or receiver.
//!
//! ## In-Memory Backend
//!
//! [`memory::InMemoryCloud`] implements every contract over `DashMap`s. It is
//! the development backend and the test double for the other crates: it
//! counts calls and can be told to fail the next call of a given operation.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod cache;
pub mod compute;
pub mod error;
pub mod factory;
pub mod identity;
pub mod memory;
pub mod message;
pub mod params;

// Re-exports
pub use cache::ClientCache;
pub use compute::{ComputeDriver, ReferenceKind, ResourceRef, Server, ServerUpdate};
pub use error::{DriverError, DriverResult};
pub use factory::{factory_for, BackendKind, DriverFactory};
pub use identity::{IdentityDriver, SessionCredentials, SessionResolver};
pub use memory::{InMemoryCloud, MemoryDriverFactory, Operation};
pub use message::{MessageDriver, QueueSpec, Subscription, SubscriptionSpec};
pub use params::ConnectionParams;
