//! The profile contract

use crate::error::Result;
use async_trait::async_trait;
use flotilla_schema::{Schema, SpecData};
use flotilla_types::NodeObject;
use serde_json::{Map, Value};

/// Behaviour of one resource type.
///
/// Methods take `&mut self` because a profile lazily builds and caches its
/// backend client. The node passed in supplies the owning (user, project)
/// for that build. Status bookkeeping belongs to
/// [`ProfileLifecycle`](crate::ProfileLifecycle), not to implementations.
#[async_trait]
pub trait Profile: Send + Sync {
    /// Registered type name, e.g. `os.nova.server`
    fn type_name(&self) -> &str;

    fn schema(&self) -> &Schema;

    /// Cross-field checks run after schema validation succeeds
    fn validate_spec(&self, _spec: &SpecData) -> Result<()> {
        Ok(())
    }

    /// Create the physical resource and return its identifier
    async fn do_create(&mut self, node: &NodeObject, spec: &SpecData) -> Result<String>;

    async fn do_delete(&mut self, node: &NodeObject, physical_id: &str) -> Result<()>;

    async fn do_update(
        &mut self,
        node: &NodeObject,
        physical_id: &str,
        current: &SpecData,
        desired: &SpecData,
    ) -> Result<()>;

    /// Whether the backend considers the resource healthy
    async fn do_check(&mut self, _node: &NodeObject, _physical_id: &str) -> Result<bool> {
        Ok(true)
    }

    /// Normalised view of the backend representation
    async fn do_get_details(&mut self, node: &NodeObject, physical_id: &str) -> Result<Map<String, Value>>;
}
