//! Flotilla Receivers - Notification channels for message receivers
//!
//! A message receiver is notified through a queue on the message bus. The
//! bus calls back into the engine through a subscription whose requests are
//! authenticated with a trust: a delegation from the receiver's owner to the
//! bus's service identity.
//!
//! - **TrustBroker**: finds or creates that trust
//! - **SubscriberUrlBuilder**: composes the `trust+` callback URL
//! - **MessageReceiver**: provisions and releases the queue + subscription
//!   pair
//!
//! Every failure names the sub-resource that failed (`queue`,
//! `subscription` or `trust`) so the caller can decide what to retry or
//! clean up. Nothing here retries on its own.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod message;
pub mod subscriber;
pub mod trust;

pub use error::{ReceiverError, Result, SubResource};
pub use message::{MessageReceiver, QUEUE_NAME_PREFIX};
pub use subscriber::SubscriberUrlBuilder;
pub use trust::{delegated_roles, TrustBroker};
