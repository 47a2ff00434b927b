//! Request context
//!
//! The identity on whose behalf an operation runs. The engine builds one per
//! action and passes it into receiver operations.

use serde::{Deserialize, Serialize};

/// Caller identity and roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// User ID of the caller
    pub user: String,

    /// Project the caller is scoped to
    pub project: String,

    /// Domain of the caller, if any
    pub domain: Option<String>,

    /// Roles the caller holds on the project
    pub roles: Vec<String>,

    /// Request identifier for log correlation
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new(user: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            project: project.into(),
            ..Default::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}
