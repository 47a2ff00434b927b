//! Identity driver contract

use crate::error::DriverResult;
use async_trait::async_trait;
use flotilla_types::Trust;
use serde::{Deserialize, Serialize};

/// Identity backend: trusts and service catalog
#[async_trait]
pub trait IdentityDriver: Send + Sync {
    /// Find the trust from `trustor` to `trustee` on `project`, if any
    async fn trust_get_by_trustor(
        &self,
        trustor: &str,
        trustee: &str,
        project: &str,
    ) -> DriverResult<Option<Trust>>;

    /// Create a trust delegating `roles`
    async fn trust_create(
        &self,
        trustor: &str,
        trustee: &str,
        project: &str,
        roles: &[String],
    ) -> DriverResult<Trust>;

    /// Public endpoint of a service from the catalog, if registered
    async fn endpoint_get(&self, service_type: &str, interface: &str) -> DriverResult<Option<String>>;
}

/// Password credentials for a service identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub auth_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub user_domain: String,
    pub project_name: String,
    pub project_domain: String,
}

/// Resolves a service identity from its session credentials
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// User ID the credentials authenticate as
    async fn user_id(&self, credentials: &SessionCredentials) -> DriverResult<String>;
}
