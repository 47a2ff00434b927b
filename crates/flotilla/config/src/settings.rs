//! Configuration groups and layered loading

use crate::error::{ConfigError, Result};
use crate::logging::LoggingConfig;
use flotilla_drivers::{BackendKind, ConnectionParams, SessionCredentials};
use flotilla_schema::UnknownKeyPolicy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine-wide settings
    pub engine: EngineSection,

    /// Receiver channel settings
    pub receiver: ReceiverConfig,

    /// Credentials of the service identity that trusts are delegated to
    pub trustee: TrusteeConfig,

    /// Credentials the engine authenticates its backend clients with
    pub authentication: AuthenticationConfig,

    /// Profile validation settings
    pub profile: ProfileConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Upper bound, in seconds, for any per-resource action timeout
    pub default_action_timeout: u64,

    /// Backend family every driver is built from
    pub cloud_backend: BackendKind,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            default_action_timeout: 3600,
            cloud_backend: BackendKind::Memory,
        }
    }
}

/// What to do with a queue whose subscription could not be created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanQueuePolicy {
    /// Leave the queue in place and log it
    #[default]
    Retain,
    /// Issue one compensating queue delete
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Host the message bus should call back; discovered when unset
    pub host: Option<String>,

    /// Port of the callback API
    pub port: u16,

    /// Maximum message post size for receiver queues, in bytes
    pub max_message_size: u32,

    /// Subscription time-to-live in seconds; the largest value the message
    /// backend accepts
    pub subscription_ttl: u64,

    pub orphan_queue_policy: OrphanQueuePolicy,

    /// Host name used when neither `host` nor the catalog yields a base URL
    pub local_host: Option<String>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 8778,
            max_message_size: 65535,
            subscription_ttl: u64::MAX,
            orphan_queue_policy: OrphanQueuePolicy::Retain,
            local_host: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrusteeConfig {
    pub auth_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub user_domain: String,
    pub project_name: String,
    pub project_domain: String,
}

impl Default for TrusteeConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:5000/v3".to_string(),
            username: "zaqar".to_string(),
            password: String::new(),
            user_domain: "Default".to_string(),
            project_name: "service".to_string(),
            project_domain: "Default".to_string(),
        }
    }
}

impl TrusteeConfig {
    /// Credentials for the delegated-session resolver
    pub fn credentials(&self) -> SessionCredentials {
        SessionCredentials {
            auth_url: self.auth_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            user_domain: self.user_domain.clone(),
            project_name: self.project_name.clone(),
            project_domain: self.project_domain.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    pub auth_url: String,
    pub service_username: String,
    #[serde(skip_serializing)]
    pub service_password: String,
    pub region_name: Option<String>,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:5000/v3".to_string(),
            service_username: "flotilla".to_string(),
            service_password: String::new(),
            region_name: None,
        }
    }
}

impl AuthenticationConfig {
    /// Connection parameters for a client acting for (user, project)
    pub fn connection_params(&self, user: &str, project: &str) -> ConnectionParams {
        ConnectionParams {
            auth_url: self.auth_url.clone(),
            user_id: user.to_string(),
            project_id: project.to_string(),
            username: self.service_username.clone(),
            password: self.service_password.clone(),
            region_name: self.region_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Treatment of spec keys no schema declares
    pub unknown_keys: UnknownKeyPolicy,
}

impl EngineConfig {
    /// Load configuration from an optional file and the environment.
    ///
    /// Built-in defaults come from the serde defaults of each group, so a
    /// missing file or an empty environment yields [`EngineConfig::default`].
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FLOTILLA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(?path, backend = ?config.engine.cloud_backend, "Loaded engine configuration");
        Ok(config)
    }

    /// Reject values no engine could run with
    pub fn validate(&self) -> Result<()> {
        if self.engine.default_action_timeout == 0 {
            return Err(ConfigError::Invalid(
                "engine.default_action_timeout must be positive".into(),
            ));
        }
        if self.receiver.port == 0 {
            return Err(ConfigError::Invalid("receiver.port must be non-zero".into()));
        }
        if self.receiver.max_message_size == 0 {
            return Err(ConfigError::Invalid(
                "receiver.max_message_size must be positive".into(),
            ));
        }
        if self.receiver.host.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid("receiver.host must not be empty".into()));
        }
        Ok(())
    }

    /// Connection parameters for a client acting for (user, project)
    pub fn connection_params(&self, user: &str, project: &str) -> ConnectionParams {
        self.authentication.connection_params(user, project)
    }
}
