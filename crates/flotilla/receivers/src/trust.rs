//! Trust broker
//!
//! At most one trust exists per (trustor, trustee, project): an existing one
//! is always reused before a new one is created.

use crate::error::{ReceiverError, Result, SubResource};
use flotilla_drivers::{DriverError, IdentityDriver, SessionCredentials, SessionResolver};
use flotilla_types::Trust;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

const ADMIN_ROLE: &str = "admin";

/// Roles to delegate from `requested`.
///
/// Duplicates are collapsed first, keeping the first occurrence. `admin` is
/// then dropped when other roles remain; it is kept only when it is the sole
/// role, since nothing would be left to delegate otherwise.
pub fn delegated_roles(requested: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(requested.len());
    for role in requested {
        if !unique.contains(role) {
            unique.push(role.clone());
        }
    }
    if unique.len() > 1 {
        unique.retain(|r| r != ADMIN_ROLE);
    }
    unique
}

pub struct TrustBroker {
    resolver: Arc<dyn SessionResolver>,
    credentials: SessionCredentials,
}

impl TrustBroker {
    /// `credentials` identify the trustee service account
    pub fn new(resolver: Arc<dyn SessionResolver>, credentials: SessionCredentials) -> Self {
        Self {
            resolver,
            credentials,
        }
    }

    /// Find or create a trust from `user` to the trustee on `project`
    #[instrument(skip(self, identity, roles), fields(trustee = %self.credentials.username))]
    pub async fn ensure_trust(
        &self,
        identity: &dyn IdentityDriver,
        user: &str,
        project: &str,
        roles: &[String],
    ) -> Result<Trust> {
        let tag = |e: DriverError| {
            error!(error = %e, "Trust could not be established");
            ReceiverError::creation(SubResource::Trust)(e)
        };

        let trustee = self.resolver.user_id(&self.credentials).await.map_err(tag)?;

        if let Some(trust) = identity
            .trust_get_by_trustor(user, &trustee, project)
            .await
            .map_err(tag)?
        {
            debug!(trust_id = %trust.id, "Reusing existing trust");
            return Ok(trust);
        }

        let delegated = delegated_roles(roles);
        let trust = identity
            .trust_create(user, &trustee, project, &delegated)
            .await
            .map_err(tag)?;
        info!(trust_id = %trust.id, roles = ?trust.roles, "Trust created");
        Ok(trust)
    }
}
