//! Profile type registry

use crate::error::{ProfileError, Result};
use crate::lifecycle::ProfileLifecycle;
use crate::profile::Profile;
use crate::server::{ServerProfile, SERVER_PROFILE_TYPE};
use flotilla_config::EngineConfig;
use flotilla_drivers::DriverFactory;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// What every profile is built with
#[derive(Clone)]
pub struct ProfileEnv {
    pub config: Arc<EngineConfig>,
    pub drivers: Arc<dyn DriverFactory>,
}

/// Builds a fresh profile instance, with an empty client cache
pub type ProfileBuilder = Arc<dyn Fn(&ProfileEnv) -> Box<dyn Profile> + Send + Sync>;

/// Resource types by name, fixed at construction
pub struct ProfileRegistry {
    env: ProfileEnv,
    builders: BTreeMap<String, ProfileBuilder>,
}

impl ProfileRegistry {
    /// Registry with the built-in resource types
    pub fn new(config: Arc<EngineConfig>, drivers: Arc<dyn DriverFactory>) -> Self {
        Self::empty(config, drivers).with_type(
            SERVER_PROFILE_TYPE,
            Arc::new(|env: &ProfileEnv| Box::new(ServerProfile::new(env.clone())) as Box<dyn Profile>),
        )
    }

    /// Registry with no resource types
    pub fn empty(config: Arc<EngineConfig>, drivers: Arc<dyn DriverFactory>) -> Self {
        Self {
            env: ProfileEnv { config, drivers },
            builders: BTreeMap::new(),
        }
    }

    /// Register a resource type, replacing any earlier one of that name
    pub fn with_type(mut self, type_name: impl Into<String>, builder: ProfileBuilder) -> Self {
        let type_name = type_name.into();
        debug!(type_name = %type_name, "Registering profile type");
        self.builders.insert(type_name, builder);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.builders.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }

    fn build(&self, type_name: &str) -> Result<Box<dyn Profile>> {
        self.builders
            .get(type_name)
            .map(|builder| builder(&self.env))
            .ok_or_else(|| ProfileError::UnknownType(type_name.to_string()))
    }

    /// JSON description of a type's schema
    pub fn describe(&self, type_name: &str) -> Result<Value> {
        Ok(self.build(type_name)?.schema().describe())
    }

    /// A lifecycle driver for a new profile instance of `type_name`
    pub fn instantiate(&self, type_name: &str, raw_spec: Value) -> Result<ProfileLifecycle> {
        let profile = self.build(type_name)?;
        Ok(ProfileLifecycle::new(
            profile,
            raw_spec,
            self.env.config.profile.unknown_keys,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_drivers::{InMemoryCloud, MemoryDriverFactory};
    use serde_json::json;

    fn registry() -> ProfileRegistry {
        let drivers = Arc::new(MemoryDriverFactory::new(Arc::new(InMemoryCloud::new())));
        ProfileRegistry::new(Arc::new(EngineConfig::default()), drivers)
    }

    #[test]
    fn test_server_type_registered() {
        let registry = registry();
        assert!(registry.contains("os.nova.server"));
        assert_eq!(registry.type_names(), vec!["os.nova.server"]);

        let lifecycle = registry
            .instantiate("os.nova.server", json!({"name": "web", "flavor": "m1.small"}))
            .unwrap();
        assert_eq!(lifecycle.type_name(), "os.nova.server");
    }

    #[test]
    fn test_unknown_type() {
        let err = registry().instantiate("os.heat.stack", json!({})).err();
        assert!(matches!(err, Some(ProfileError::UnknownType(name)) if name == "os.heat.stack"));
    }

    #[test]
    fn test_describe_schema() {
        let described = registry().describe("os.nova.server").unwrap();
        assert_eq!(described["flavor"]["required"], true);
        assert_eq!(described["timeout"]["default"], 120);
    }
}
