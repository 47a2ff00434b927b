//! Flotilla Types - Core types for the cluster orchestration core
//!
//! Flotilla manages collections of cloud resources as logical clusters and
//! reacts to external triggers. This crate holds the plain data shared by the
//! profile and receiver crates; it has no behaviour that touches a backend.
//!
//! ## Key Concepts
//!
//! - **NodeObject**: the engine-owned record a profile operates on
//! - **Receiver**: reacts to an external trigger by invoking a cluster action
//! - **Channel**: the queue + subscription pair that notifies a receiver
//! - **Trust**: a delegation credential from a user to a service identity
//! - **RequestContext**: who is asking, and with which roles

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod context;
pub mod ids;
pub mod node;
pub mod receiver;
pub mod trust;

// Re-export main types
pub use context::RequestContext;
pub use ids::{ClusterId, NodeId, ReceiverId};
pub use node::{NodeObject, NodeStatus};
pub use receiver::{Channel, ChannelView, Receiver, ReceiverType, ReceiverView};
pub use trust::Trust;
