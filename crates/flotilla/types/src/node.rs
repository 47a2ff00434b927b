//! Node types
//!
//! A NodeObject is the engine-owned record of one physical resource. Profiles
//! read its identity and ownership, and record the backend-assigned physical
//! identifier on it once a create succeeds.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Engine-owned record of a single physical resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeObject {
    /// Unique node identifier
    pub id: NodeId,

    /// Logical name, passed to the backend on create when set
    pub name: Option<String>,

    /// Backend-assigned identifier; present only between create and delete
    pub physical_id: Option<String>,

    /// Owning user
    pub user: String,

    /// Owning project
    pub project: String,

    /// Owning domain
    pub domain: Option<String>,

    /// Lifecycle status
    pub status: NodeStatus,

    /// Created timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last status change
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl NodeObject {
    pub fn new(user: impl Into<String>, project: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: NodeId::generate(),
            name: None,
            physical_id: None,
            user: user.into(),
            project: project.into(),
            domain: None,
            status: NodeStatus::Unvalidated,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_physical_id(mut self, physical_id: impl Into<String>) -> Self {
        self.physical_id = Some(physical_id.into());
        self
    }

    /// The physical identifier, treating an empty string as absent
    pub fn physical_id(&self) -> Option<&str> {
        self.physical_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Move to a new status and stamp the change
    pub fn set_status(&mut self, status: NodeStatus) {
        self.status = status;
        self.updated_at = chrono::Utc::now();
    }
}

/// Lifecycle status of a node as driven by its profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Spec has not been checked yet
    Unvalidated,
    /// Spec passed schema and profile checks
    Validated,
    /// Backend create issued
    Creating,
    /// Physical resource exists
    Active,
    /// Backend update issued
    Updating,
    /// Backend delete issued
    Deleting,
    /// Physical resource is gone
    Deleted,
    /// Last operation failed
    Error { message: String },
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Deleted)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeStatus::Unvalidated => "UNVALIDATED",
            NodeStatus::Validated => "VALIDATED",
            NodeStatus::Creating => "CREATING",
            NodeStatus::Active => "ACTIVE",
            NodeStatus::Updating => "UPDATING",
            NodeStatus::Deleting => "DELETING",
            NodeStatus::Deleted => "DELETED",
            NodeStatus::Error { .. } => "ERROR",
        }
    }
}
