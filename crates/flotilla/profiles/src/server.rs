//! Server profile (`os.nova.server`)
//!
//! Image and flavor are given by identifier or by name and resolved before
//! the create call. Updates apply the name and metadata in place; any other
//! changed attribute needs a rebuild and is only reported.

use crate::error::{ProfileError, Result};
use crate::profile::Profile;
use crate::registry::ProfileEnv;
use async_trait::async_trait;
use flotilla_drivers::{ClientCache, ComputeDriver, ReferenceKind, ResourceRef, Server, ServerUpdate};
use flotilla_schema::{Attribute, Schema, SpecData};
use flotilla_types::NodeObject;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SERVER_PROFILE_TYPE: &str = "os.nova.server";

/// Attributes an update can change without rebuilding the server
const UPDATABLE: &[&str] = &["name", "metadata"];

/// Attributes that only steer the engine and are not sent to the backend
const ENGINE_ONLY: &[&str] = &["context", "timeout"];

pub struct ServerProfile {
    env: ProfileEnv,
    schema: Schema,
    compute: ClientCache<dyn ComputeDriver>,
}

impl ServerProfile {
    pub fn new(env: ProfileEnv) -> Self {
        Self {
            env,
            schema: server_schema(),
            compute: ClientCache::new(),
        }
    }

    fn compute(&mut self, node: &NodeObject) -> Result<Arc<dyn ComputeDriver>> {
        let params = self.env.config.connection_params(&node.user, &node.project);
        let drivers = Arc::clone(&self.env.drivers);
        Ok(self.compute.get_or_try_init(|| drivers.compute(&params))?)
    }

    /// Resolve a reference by identifier, then by name
    async fn resolve_reference(
        compute: &dyn ComputeDriver,
        kind: ReferenceKind,
        reference: &str,
    ) -> Result<ResourceRef> {
        match compute.find_by_id(kind, reference).await {
            Ok(found) => return Ok(found),
            Err(e) => debug!(%kind, reference, error = %e, "Lookup by id failed, trying name"),
        }

        compute.find_by_name(kind, reference).await.map_err(|e| {
            warn!(%kind, reference, error = %e, "Reference could not be resolved");
            ProfileError::ResourceNotFound {
                kind: kind.to_string(),
                reference: reference.to_string(),
            }
        })
    }

    fn create_attrs(node: &NodeObject, spec: &SpecData) -> Map<String, Value> {
        let mut attrs: Map<String, Value> = spec
            .iter_set()
            .filter(|(name, _)| !ENGINE_ONLY.contains(name))
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();

        if let Some(name) = node.name.as_deref().filter(|n| !n.is_empty()) {
            attrs.insert("name".into(), json!(name));
        }
        attrs
    }
}

fn server_schema() -> Schema {
    Schema::new()
        .attribute("context", Attribute::map("Customized security context for operating servers."))
        .attribute("adminPass", Attribute::string("Password for the administrator account."))
        .attribute(
            "auto_disk_config",
            Attribute::boolean("Whether the disk partition is done automatically.").with_default(json!(true)),
        )
        .attribute(
            "availability_zone",
            Attribute::string("Name of availability zone for running the server."),
        )
        .attribute(
            "block_device_mapping",
            Attribute::list("A list specifying the properties of block devices to be used for this server.").of(
                Attribute::map("A map specifying the properties of a block device to be used by the server.")
                    .fields(
                        Schema::new()
                            .attribute(
                                "device_name",
                                Attribute::string("Block device name, should be <=255 chars."),
                            )
                            .attribute("volume_size", Attribute::integer("The size of the volume in GB.")),
                    ),
            ),
        )
        .attribute(
            "config_drive",
            Attribute::boolean("Whether config drive should be enabled for the server."),
        )
        .attribute(
            "flavor",
            Attribute::string("ID or name of the flavor used for the server.").required(),
        )
        .attribute("image", Attribute::string("ID or name of image used for the server."))
        .attribute(
            "key_name",
            Attribute::string("Name of a key pair injected into the server."),
        )
        .attribute("metadata", Attribute::map("A collection of key/value pairs attached to the server."))
        .attribute("name", Attribute::string("Name of the server.").required())
        .attribute(
            "networks",
            Attribute::list("Networks the server is attached to.").of(
                Attribute::map("A network the server is attached to.").fields(
                    Schema::new()
                        .attribute("port", Attribute::string("Port ID to be used by the network."))
                        .attribute("fixed-ip", Attribute::string("Fixed IP to be used by the network.")),
                ),
            ),
        )
        .attribute(
            "personality",
            Attribute::list("List of files to be injected into the server.").of(
                Attribute::map("A file to be injected into the server.").fields(
                    Schema::new()
                        .attribute("path", Attribute::string("Path to the file.").required())
                        .attribute("contents", Attribute::string("Contents of the file.").required()),
                ),
            ),
        )
        .attribute(
            "security_groups",
            Attribute::list("List of security groups.").of(Attribute::string("Name of a security group")),
        )
        .attribute(
            "timeout",
            Attribute::integer("Seconds to wait for a server operation to complete.").with_default(json!(120)),
        )
        .attribute("user_data", Attribute::string("User data to be exposed by the metadata server."))
}

fn details_of(server: &Server) -> Map<String, Value> {
    let reference_id = |r: &Option<ResourceRef>| r.as_ref().map(|r| json!(r.id)).unwrap_or(Value::Null);
    let timestamp = |t: &Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| json!(t.to_rfc3339())).unwrap_or(Value::Null)
    };

    let mut details = Map::new();
    details.insert("id".into(), json!(server.id));
    details.insert("name".into(), json!(server.name));
    details.insert("access_ipv4".into(), json!(server.access_ipv4));
    details.insert("access_ipv6".into(), json!(server.access_ipv6));
    details.insert("addresses".into(), Value::Object(server.addresses.clone()));
    details.insert("created".into(), timestamp(&server.created));
    details.insert("flavor".into(), reference_id(&server.flavor));
    details.insert("host_id".into(), json!(server.host_id));
    details.insert("image".into(), reference_id(&server.image));
    details.insert("links".into(), Value::Array(server.links.clone()));
    details.insert("metadata".into(), Value::Object(server.metadata.clone()));
    details.insert("project_id".into(), json!(server.project_id));
    details.insert("status".into(), json!(server.status));
    details.insert("updated".into(), timestamp(&server.updated));
    details.insert("user_id".into(), json!(server.user_id));
    details
}

#[async_trait]
impl Profile for ServerProfile {
    fn type_name(&self) -> &str {
        SERVER_PROFILE_TYPE
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn validate_spec(&self, spec: &SpecData) -> Result<()> {
        let Some(timeout) = spec.get_i64("timeout") else {
            return Ok(());
        };
        let ceiling = self.env.config.engine.default_action_timeout;
        if timeout <= 0 {
            return Err(ProfileError::InvalidSpec(format!(
                "timeout must be positive, got {}",
                timeout
            )));
        }
        if u64::try_from(timeout).map_or(true, |t| t > ceiling) {
            return Err(ProfileError::InvalidSpec(format!(
                "timeout {} exceeds the action timeout ceiling {}",
                timeout, ceiling
            )));
        }
        Ok(())
    }

    async fn do_create(&mut self, node: &NodeObject, spec: &SpecData) -> Result<String> {
        let compute = self.compute(node)?;
        let mut attrs = Self::create_attrs(node, spec);

        let flavor = spec
            .get_str("flavor")
            .ok_or_else(|| ProfileError::InvalidSpec("flavor is required".into()))?;
        let flavor = Self::resolve_reference(compute.as_ref(), ReferenceKind::Flavor, flavor).await?;
        attrs.insert("flavor".into(), json!(flavor));

        if let Some(image) = spec.get_str("image") {
            let image = Self::resolve_reference(compute.as_ref(), ReferenceKind::Image, image).await?;
            attrs.insert("image".into(), json!(image));
        }

        let server = compute.server_create(attrs).await?;
        info!(server_id = %server.id, flavor = %flavor.id, "Server created");
        Ok(server.id)
    }

    async fn do_delete(&mut self, node: &NodeObject, physical_id: &str) -> Result<()> {
        let compute = self.compute(node)?;
        compute.server_delete(physical_id).await?;
        info!(server_id = physical_id, "Server deleted");
        Ok(())
    }

    async fn do_update(
        &mut self,
        node: &NodeObject,
        physical_id: &str,
        current: &SpecData,
        desired: &SpecData,
    ) -> Result<()> {
        let mut update = ServerUpdate::default();
        // A named node keeps its own name on the server
        let node_named = node.name.as_deref().is_some_and(|n| !n.is_empty());
        if !node_named && current.get("name") != desired.get("name") {
            update.name = desired.get_str("name").map(str::to_string);
        }
        if current.get("metadata") != desired.get("metadata") {
            update.metadata = Some(
                desired
                    .get("metadata")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            );
        }

        let deferred: Vec<&str> = self
            .schema
            .iter()
            .map(|(name, _)| name)
            .filter(|name| !UPDATABLE.contains(name) && !ENGINE_ONLY.contains(name))
            .filter(|name| current.get(name) != desired.get(name))
            .collect();
        if !deferred.is_empty() {
            warn!(server_id = physical_id, fields = ?deferred, "Server update deferred; these fields need a rebuild");
        }

        if update.is_empty() {
            debug!(server_id = physical_id, "Nothing to update in place");
            return Ok(());
        }

        let compute = self.compute(node)?;
        compute.server_update(physical_id, update).await?;
        info!(server_id = physical_id, "Server updated");
        Ok(())
    }

    async fn do_check(&mut self, node: &NodeObject, physical_id: &str) -> Result<bool> {
        let compute = self.compute(node)?;
        let server = compute.server_get(physical_id).await?;
        Ok(server.is_some_and(|s| s.status == "ACTIVE"))
    }

    async fn do_get_details(&mut self, node: &NodeObject, physical_id: &str) -> Result<Map<String, Value>> {
        let compute = self.compute(node)?;
        Ok(compute
            .server_get(physical_id)
            .await?
            .map(|server| details_of(&server))
            .unwrap_or_default())
    }
}
