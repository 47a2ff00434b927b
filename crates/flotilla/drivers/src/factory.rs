//! Driver factories
//!
//! One factory per backend family. The family is chosen from configuration
//! when the engine is assembled and never changes afterwards.

use crate::compute::ComputeDriver;
use crate::error::DriverResult;
use crate::identity::{IdentityDriver, SessionResolver};
use crate::memory::{InMemoryCloud, MemoryDriverFactory};
use crate::message::MessageDriver;
use crate::params::ConnectionParams;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Backend families
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process backend for development and testing
    #[default]
    Memory,
}

/// Builds per-owner client handles for one backend family
pub trait DriverFactory: Send + Sync {
    /// Backend family name
    fn name(&self) -> &str;

    fn compute(&self, params: &ConnectionParams) -> DriverResult<Arc<dyn ComputeDriver>>;

    fn message(&self, params: &ConnectionParams) -> DriverResult<Arc<dyn MessageDriver>>;

    fn identity(&self, params: &ConnectionParams) -> DriverResult<Arc<dyn IdentityDriver>>;

    /// Resolver for service identities; not tied to an owner
    fn session_resolver(&self) -> Arc<dyn SessionResolver>;
}

/// Build the factory for a backend family
pub fn factory_for(kind: BackendKind) -> Arc<dyn DriverFactory> {
    match kind {
        BackendKind::Memory => Arc::new(MemoryDriverFactory::new(Arc::new(InMemoryCloud::new()))),
    }
}
