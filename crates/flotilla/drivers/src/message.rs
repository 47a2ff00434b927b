//! Message bus driver contract

use crate::error::DriverResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Queue creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSpec {
    pub name: String,
    pub description: String,
    /// Upper bound on the size of one message post, in bytes
    pub max_messages_post_size: u32,
}

/// Subscription creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    /// URL the backend notifies
    pub subscriber: String,
    /// Lifetime in seconds
    pub ttl: u64,
    /// Backend options, e.g. the trust to authenticate with
    pub options: Map<String, Value>,
}

/// A created subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: String,
    pub queue_name: String,
    pub subscriber: String,
    pub ttl: u64,
    pub options: Map<String, Value>,
}

/// Message bus backend
#[async_trait]
pub trait MessageDriver: Send + Sync {
    async fn queue_create(&self, spec: QueueSpec) -> DriverResult<()>;

    async fn queue_delete(&self, name: &str) -> DriverResult<()>;

    async fn subscription_create(&self, queue_name: &str, spec: SubscriptionSpec) -> DriverResult<Subscription>;

    async fn subscription_delete(&self, queue_name: &str, subscription_id: &str) -> DriverResult<()>;
}
