//! Connection parameters

use serde::{Deserialize, Serialize};

/// Everything a driver needs to build a client acting for one owner.
///
/// Built from the owning profile's node or receiver (user, project) plus the
/// service credentials from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Identity API endpoint
    pub auth_url: String,

    /// User the client acts for
    pub user_id: String,

    /// Project the client is scoped to
    pub project_id: String,

    /// Service user performing the calls on the owner's behalf
    pub username: String,

    /// Service user's password
    #[serde(skip_serializing)]
    pub password: String,

    /// Region for endpoint selection
    pub region_name: Option<String>,
}

impl ConnectionParams {
    pub fn new(
        auth_url: impl Into<String>,
        user_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            user_id: user_id.into(),
            project_id: project_id.into(),
            username: String::new(),
            password: String::new(),
            region_name: None,
        }
    }
}
