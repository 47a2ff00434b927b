//! Compute driver contract
//!
//! Servers are created from a resolved attribute map; the references inside
//! it (image, flavor) have already been looked up through
//! [`ComputeDriver::find_by_id`] / [`ComputeDriver::find_by_name`].

use crate::error::DriverResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kinds of resources a server spec refers to by id or name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Image,
    Flavor,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Image => f.write_str("image"),
            ReferenceKind::Flavor => f.write_str("flavor"),
        }
    }
}

/// A resolved reference to another backend resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ReferenceKind,
    pub id: String,
    pub name: String,
}

/// Backend representation of a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub access_ipv4: Option<String>,
    pub access_ipv6: Option<String>,
    pub addresses: Map<String, Value>,
    pub created: Option<chrono::DateTime<chrono::Utc>>,
    pub updated: Option<chrono::DateTime<chrono::Utc>>,
    pub flavor: Option<ResourceRef>,
    pub image: Option<ResourceRef>,
    pub host_id: Option<String>,
    pub links: Vec<Value>,
    pub metadata: Map<String, Value>,
    pub project_id: String,
    pub user_id: String,
    pub status: String,
}

/// Mutable server fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerUpdate {
    pub name: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl ServerUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.metadata.is_none()
    }
}

/// Physical resource backend
#[async_trait]
pub trait ComputeDriver: Send + Sync {
    /// Look up a referenced resource by identifier
    async fn find_by_id(&self, kind: ReferenceKind, id: &str) -> DriverResult<ResourceRef>;

    /// Look up a referenced resource by name
    async fn find_by_name(&self, kind: ReferenceKind, name: &str) -> DriverResult<ResourceRef>;

    /// Create a server from a fully resolved attribute map
    async fn server_create(&self, attrs: Map<String, Value>) -> DriverResult<Server>;

    /// Fetch a server; `Ok(None)` when the backend has no record of it
    async fn server_get(&self, id: &str) -> DriverResult<Option<Server>>;

    /// Apply in-place changes to a server
    async fn server_update(&self, id: &str, update: ServerUpdate) -> DriverResult<()>;

    /// Delete a server
    async fn server_delete(&self, id: &str) -> DriverResult<()>;
}
