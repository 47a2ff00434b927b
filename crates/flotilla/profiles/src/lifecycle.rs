//! Profile lifecycle driver
//!
//! [`ProfileLifecycle`] pairs a profile with the raw spec it was given and
//! drives nodes through the profile's operations. One lifecycle must not be
//! driven by two operations at once; the `&mut self` receivers enforce that
//! within a process, and the engine's action locks enforce it across them.

use crate::error::{ProfileError, Result};
use crate::profile::Profile;
use flotilla_schema::{SpecData, UnknownKeyPolicy};
use flotilla_types::{NodeObject, NodeStatus};
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

pub struct ProfileLifecycle {
    profile: Box<dyn Profile>,
    raw_spec: Value,
    spec_data: Option<SpecData>,
    unknown_keys: UnknownKeyPolicy,
}

impl ProfileLifecycle {
    pub fn new(profile: Box<dyn Profile>, raw_spec: Value, unknown_keys: UnknownKeyPolicy) -> Self {
        Self {
            profile,
            raw_spec,
            spec_data: None,
            unknown_keys,
        }
    }

    pub fn type_name(&self) -> &str {
        self.profile.type_name()
    }

    pub fn raw_spec(&self) -> &Value {
        &self.raw_spec
    }

    /// Resolved spec, once [`ProfileLifecycle::validate`] has succeeded
    pub fn spec_data(&self) -> Option<&SpecData> {
        self.spec_data.as_ref()
    }

    fn resolve(&self, raw: &Value) -> Result<SpecData> {
        let data = self.profile.schema().validate(raw, self.unknown_keys)?;
        self.profile.validate_spec(&data)?;
        Ok(data)
    }

    fn current_spec(&mut self) -> Result<SpecData> {
        match &self.spec_data {
            Some(data) => Ok(data.clone()),
            None => {
                let data = self.resolve(&self.raw_spec)?;
                self.spec_data = Some(data.clone());
                Ok(data)
            }
        }
    }

    /// Refuse to start `operation` on a deleted node or one with an
    /// operation already in flight
    fn guard(operation: &str, node: &NodeObject) -> Result<()> {
        match node.status {
            NodeStatus::Deleted | NodeStatus::Creating | NodeStatus::Updating | NodeStatus::Deleting => {
                Err(ProfileError::invalid_state(operation, node.status.name()))
            }
            _ => Ok(()),
        }
    }

    fn fail(node: &mut NodeObject, err: ProfileError) -> ProfileError {
        error!(node_id = %node.id, error = %err, "Profile operation failed");
        node.set_status(NodeStatus::Error {
            message: err.to_string(),
        });
        err
    }

    /// Validate the spec against the schema and the profile's own checks.
    ///
    /// Never touches the backend. A node that has not been created yet moves
    /// to VALIDATED.
    #[instrument(skip(self, node), fields(node_id = %node.id, profile = %self.profile.type_name()))]
    pub fn validate(&mut self, node: &mut NodeObject) -> Result<bool> {
        Self::guard("validate", node)?;

        let data = self.resolve(&self.raw_spec)?;
        self.spec_data = Some(data);

        if node.physical_id().is_none()
            && matches!(node.status, NodeStatus::Unvalidated | NodeStatus::Error { .. })
        {
            node.set_status(NodeStatus::Validated);
        }
        debug!("Spec validated");
        Ok(true)
    }

    /// Create the physical resource and record its identifier on the node
    #[instrument(skip(self, node), fields(node_id = %node.id, profile = %self.profile.type_name()))]
    pub async fn create(&mut self, node: &mut NodeObject) -> Result<String> {
        Self::guard("create", node)?;
        if node.physical_id().is_some() {
            return Err(ProfileError::invalid_state("create", node.status.name()));
        }

        if self.spec_data.is_none() || node.status == NodeStatus::Unvalidated {
            self.validate(node)?;
        }
        let spec = self.current_spec()?;

        node.set_status(NodeStatus::Creating);
        match self.profile.do_create(node, &spec).await {
            Ok(physical_id) => {
                node.physical_id = Some(physical_id.clone());
                node.set_status(NodeStatus::Active);
                info!(physical_id = %physical_id, "Node created");
                Ok(physical_id)
            }
            Err(e) => Err(Self::fail(node, e)),
        }
    }

    /// Delete the physical resource. A node that was never created is
    /// deleted trivially without any backend call.
    #[instrument(skip(self, node), fields(node_id = %node.id, profile = %self.profile.type_name()))]
    pub async fn delete(&mut self, node: &mut NodeObject) -> Result<bool> {
        let Some(physical_id) = node.physical_id().map(str::to_string) else {
            debug!("No physical resource, nothing to delete");
            return Ok(true);
        };
        Self::guard("delete", node)?;

        node.set_status(NodeStatus::Deleting);
        match self.profile.do_delete(node, &physical_id).await {
            Ok(()) => {
                node.physical_id = None;
                node.set_status(NodeStatus::Deleted);
                info!(physical_id = %physical_id, "Node deleted");
                Ok(true)
            }
            Err(e) => Err(Self::fail(node, e)),
        }
    }

    /// Apply a new spec. The new spec is validated before any backend call;
    /// on success it replaces the current one.
    #[instrument(skip(self, node, new_spec), fields(node_id = %node.id, profile = %self.profile.type_name()))]
    pub async fn update(&mut self, node: &mut NodeObject, new_spec: Value) -> Result<bool> {
        let Some(physical_id) = node.physical_id().map(str::to_string) else {
            debug!("No physical resource, nothing to update");
            return Ok(true);
        };
        Self::guard("update", node)?;

        let desired = self.resolve(&new_spec)?;
        let current = self.current_spec()?;

        node.set_status(NodeStatus::Updating);
        match self.profile.do_update(node, &physical_id, &current, &desired).await {
            Ok(()) => {
                self.raw_spec = new_spec;
                self.spec_data = Some(desired);
                node.set_status(NodeStatus::Active);
                info!(physical_id = %physical_id, "Node updated");
                Ok(true)
            }
            Err(e) => Err(Self::fail(node, e)),
        }
    }

    /// Ask the backend whether the resource is healthy.
    ///
    /// A node with no physical resource is reported unhealthy (`false`)
    /// without consulting the profile.
    #[instrument(skip(self, node), fields(node_id = %node.id, profile = %self.profile.type_name()))]
    pub async fn check(&mut self, node: &NodeObject) -> Result<bool> {
        match node.physical_id() {
            Some(physical_id) => self.profile.do_check(node, physical_id).await,
            None => Ok(false),
        }
    }

    /// Backend view of the resource, or an empty map when none exists
    #[instrument(skip(self, node), fields(node_id = %node.id, profile = %self.profile.type_name()))]
    pub async fn get_details(&mut self, node: &NodeObject) -> Result<Map<String, Value>> {
        match node.physical_id() {
            Some(physical_id) => self.profile.do_get_details(node, physical_id).await,
            None => Ok(Map::new()),
        }
    }
}
