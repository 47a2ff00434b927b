//! Receiver types
//!
//! A Receiver reacts to an external trigger by invoking an action on a
//! cluster. Message-triggered receivers own a [`Channel`]; its subscription
//! identifier is internal and never appears in the external view.

use crate::{ClusterId, ReceiverId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A receiver bound to a cluster action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    /// Unique receiver identifier
    pub id: ReceiverId,

    /// Human-readable name
    pub name: String,

    /// Trigger mechanism
    pub receiver_type: ReceiverType,

    /// Target cluster
    pub cluster_id: Option<ClusterId>,

    /// Action to invoke on the cluster
    pub action: Option<String>,

    /// Owning user
    pub user: String,

    /// Owning project
    pub project: String,

    /// Owning domain
    pub domain: Option<String>,

    /// Roles captured from the creating request, delegated through a trust
    pub notifier_roles: Vec<String>,

    /// Queue + subscription pair, present once initialised
    pub channel: Option<Channel>,

    /// Credentials or identity of the triggering actor
    pub actor: Map<String, Value>,

    /// Parameters passed to the action
    pub params: Map<String, Value>,

    /// Created timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last modification
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Receiver {
    /// Create a new receiver with no channel
    pub fn new(
        receiver_type: ReceiverType,
        name: impl Into<String>,
        user: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            id: ReceiverId::generate(),
            name: name.into(),
            receiver_type,
            cluster_id: None,
            action: None,
            user: user.into(),
            project: project.into(),
            domain: None,
            notifier_roles: Vec::new(),
            channel: None,
            actor: Map::new(),
            params: Map::new(),
            created_at: chrono::Utc::now(),
            updated_at: None,
        }
    }

    pub fn with_id(mut self, id: ReceiverId) -> Self {
        self.id = id;
        self
    }

    pub fn with_target(mut self, cluster_id: ClusterId, action: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id);
        self.action = Some(action.into());
        self
    }

    /// The serialized form handed to API clients
    pub fn to_view(&self) -> ReceiverView {
        ReceiverView {
            id: self.id.clone(),
            name: self.name.clone(),
            receiver_type: self.receiver_type,
            user: self.user.clone(),
            project: self.project.clone(),
            domain: self.domain.clone(),
            cluster_id: self.cluster_id.clone(),
            action: self.action.clone(),
            actor: self.actor.clone(),
            params: self.params.clone(),
            channel: self.channel.as_ref().map(Channel::to_view),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Receiver trigger mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverType {
    /// Triggered by an HTTP call to a webhook URL
    Webhook,
    /// Triggered by messages posted to a queue
    Message,
}

/// Queue + subscription pair notifying a message receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub queue_name: String,
    /// Cleared once the subscription is confirmed deleted while the queue
    /// is still awaiting release
    pub subscription: Option<String>,
}

impl Channel {
    /// External view: the queue name only
    pub fn to_view(&self) -> ChannelView {
        ChannelView {
            queue_name: self.queue_name.clone(),
        }
    }
}

/// Externally visible part of a [`Channel`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelView {
    pub queue_name: String,
}

/// Serialized receiver as consumed by API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverView {
    pub id: ReceiverId,
    pub name: String,
    #[serde(rename = "type")]
    pub receiver_type: ReceiverType,
    pub user: String,
    pub project: String,
    pub domain: Option<String>,
    pub cluster_id: Option<ClusterId>,
    pub action: Option<String>,
    pub actor: Map<String, Value>,
    pub params: Map<String, Value>,
    pub channel: Option<ChannelView>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}
