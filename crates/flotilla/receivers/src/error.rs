//! Receiver error types

use flotilla_drivers::DriverError;
use flotilla_types::ReceiverId;
use std::fmt;
use thiserror::Error;

/// The part of a channel an operation failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubResource {
    Queue,
    Subscription,
    Trust,
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubResource::Queue => f.write_str("queue"),
            SubResource::Subscription => f.write_str("subscription"),
            SubResource::Trust => f.write_str("trust"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("Failed in creating {resource}: {source}")]
    ResourceCreation {
        resource: SubResource,
        source: DriverError,
    },

    #[error("Failed in deleting {resource} '{id}': {source}")]
    ResourceDeletion {
        resource: SubResource,
        id: String,
        source: DriverError,
    },

    #[error("Receiver {0} has no channel")]
    NoChannel(ReceiverId),

    #[error("Receiver {0} already has a channel")]
    ChannelExists(ReceiverId),
}

impl ReceiverError {
    pub fn creation(resource: SubResource) -> impl FnOnce(DriverError) -> Self {
        move |source| ReceiverError::ResourceCreation { resource, source }
    }

    pub fn deletion(resource: SubResource, id: impl Into<String>) -> impl FnOnce(DriverError) -> Self {
        let id = id.into();
        move |source| ReceiverError::ResourceDeletion { resource, id, source }
    }

    /// The sub-resource a creation or deletion failure is tagged with
    pub fn resource(&self) -> Option<SubResource> {
        match self {
            ReceiverError::ResourceCreation { resource, .. }
            | ReceiverError::ResourceDeletion { resource, .. } => Some(*resource),
            _ => None,
        }
    }
}

/// Result type for receiver operations
pub type Result<T> = std::result::Result<T, ReceiverError>;
