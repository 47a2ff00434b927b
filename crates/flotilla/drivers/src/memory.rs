//! In-memory implementations of the driver contracts
//!
//! Suitable for development and testing. One [`InMemoryCloud`] holds the
//! state of every backend; [`MemoryDriverFactory`] hands out clients bound
//! to it, each carrying the (user, project) it was built for.

use crate::compute::{ComputeDriver, ReferenceKind, ResourceRef, Server, ServerUpdate};
use crate::error::{DriverError, DriverResult};
use crate::factory::DriverFactory;
use crate::identity::{IdentityDriver, SessionCredentials, SessionResolver};
use crate::message::{MessageDriver, QueueSpec, Subscription, SubscriptionSpec};
use crate::params::ConnectionParams;
use async_trait::async_trait;
use dashmap::DashMap;
use flotilla_types::Trust;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Backend operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindById,
    FindByName,
    ServerCreate,
    ServerGet,
    ServerUpdate,
    ServerDelete,
    QueueCreate,
    QueueDelete,
    SubscriptionCreate,
    SubscriptionDelete,
    TrustGet,
    TrustCreate,
    EndpointGet,
    SessionUserId,
}

/// Shared state of the in-memory compute, message and identity backends
#[derive(Default)]
pub struct InMemoryCloud {
    references: DashMap<(ReferenceKind, String), ResourceRef>,
    servers: DashMap<String, Server>,
    queues: DashMap<String, QueueSpec>,
    subscriptions: DashMap<String, Subscription>,
    trusts: DashMap<String, Trust>,
    endpoints: DashMap<(String, String), String>,
    service_users: DashMap<String, String>,
    calls: DashMap<Operation, usize>,
    failures: DashMap<Operation, DriverError>,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image or flavor that specs may refer to
    pub fn add_reference(&self, kind: ReferenceKind, id: impl Into<String>, name: impl Into<String>) -> ResourceRef {
        let reference = ResourceRef {
            kind,
            id: id.into(),
            name: name.into(),
        };
        self.references
            .insert((kind, reference.id.clone()), reference.clone());
        reference
    }

    /// Register a catalog endpoint
    pub fn add_endpoint(&self, service_type: impl Into<String>, interface: impl Into<String>, url: impl Into<String>) {
        self.endpoints
            .insert((service_type.into(), interface.into()), url.into());
    }

    /// Register a service user that session credentials resolve to
    pub fn add_service_user(&self, username: impl Into<String>, user_id: impl Into<String>) {
        self.service_users.insert(username.into(), user_id.into());
    }

    /// Seed an existing trust
    pub fn add_trust(&self, trust: Trust) {
        self.trusts.insert(trust.id.clone(), trust);
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: Operation, error: DriverError) {
        self.failures.insert(op, error);
    }

    /// Number of times `op` has been invoked
    pub fn calls(&self, op: Operation) -> usize {
        self.calls.get(&op).map(|c| *c).unwrap_or(0)
    }

    pub fn server(&self, id: &str) -> Option<Server> {
        self.servers.get(id).map(|s| s.clone())
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn queue(&self, name: &str) -> Option<QueueSpec> {
        self.queues.get(name).map(|q| q.clone())
    }

    pub fn subscription(&self, id: &str) -> Option<Subscription> {
        self.subscriptions.get(id).map(|s| s.clone())
    }

    pub fn subscriptions_for(&self, queue_name: &str) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.queue_name == queue_name)
            .map(|s| s.value().clone())
            .collect()
    }

    pub fn trusts(&self) -> Vec<Trust> {
        self.trusts.iter().map(|t| t.value().clone()).collect()
    }

    /// Count the call and consume a pending injected failure
    fn begin(&self, op: Operation) -> DriverResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.remove(&op) {
            Some((_, error)) => {
                debug!(?op, %error, "Injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

/// Client bound to one owner's connection parameters
pub struct MemoryClient {
    cloud: Arc<InMemoryCloud>,
    params: ConnectionParams,
}

impl MemoryClient {
    pub fn new(cloud: Arc<InMemoryCloud>, params: ConnectionParams) -> Self {
        Self { cloud, params }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }
}

fn reference_from(attrs: &Map<String, Value>, key: &str) -> DriverResult<Option<ResourceRef>> {
    match attrs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| DriverError::Rejected(format!("invalid {}: {}", key, e))),
    }
}

#[async_trait]
impl ComputeDriver for MemoryClient {
    async fn find_by_id(&self, kind: ReferenceKind, id: &str) -> DriverResult<ResourceRef> {
        self.cloud.begin(Operation::FindById)?;
        self.cloud
            .references
            .get(&(kind, id.to_string()))
            .map(|r| r.clone())
            .ok_or_else(|| DriverError::not_found(kind.to_string(), id))
    }

    async fn find_by_name(&self, kind: ReferenceKind, name: &str) -> DriverResult<ResourceRef> {
        self.cloud.begin(Operation::FindByName)?;
        let mut matches: Vec<ResourceRef> = self
            .cloud
            .references
            .iter()
            .filter(|r| r.kind == kind && r.name == name)
            .map(|r| r.value().clone())
            .collect();

        if matches.len() > 1 {
            return Err(DriverError::Conflict(format!(
                "{} {} resources named '{}'",
                matches.len(),
                kind,
                name
            )));
        }
        matches
            .pop()
            .ok_or_else(|| DriverError::not_found(kind.to_string(), name))
    }

    async fn server_create(&self, attrs: Map<String, Value>) -> DriverResult<Server> {
        self.cloud.begin(Operation::ServerCreate)?;

        let flavor = reference_from(&attrs, "flavor")?
            .ok_or_else(|| DriverError::Rejected("flavor is required".into()))?;
        let image = reference_from(&attrs, "image")?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now();

        let server = Server {
            id: id.clone(),
            name: attrs
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            access_ipv4: None,
            access_ipv6: None,
            addresses: Map::new(),
            created: Some(now),
            updated: Some(now),
            flavor: Some(flavor),
            image,
            host_id: Some(format!("host-{}", &id[..8])),
            links: vec![json!({"rel": "self", "href": format!("memory://compute/servers/{}", id)})],
            metadata: attrs
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            project_id: self.params.project_id.clone(),
            user_id: self.params.user_id.clone(),
            status: "ACTIVE".to_string(),
        };

        self.cloud.servers.insert(id, server.clone());
        Ok(server)
    }

    async fn server_get(&self, id: &str) -> DriverResult<Option<Server>> {
        self.cloud.begin(Operation::ServerGet)?;
        Ok(self.cloud.server(id))
    }

    async fn server_update(&self, id: &str, update: ServerUpdate) -> DriverResult<()> {
        self.cloud.begin(Operation::ServerUpdate)?;
        let mut server = self
            .cloud
            .servers
            .get_mut(id)
            .ok_or_else(|| DriverError::not_found("server", id))?;
        if let Some(name) = update.name {
            server.name = name;
        }
        if let Some(metadata) = update.metadata {
            server.metadata = metadata;
        }
        server.updated = Some(chrono::Utc::now());
        Ok(())
    }

    async fn server_delete(&self, id: &str) -> DriverResult<()> {
        self.cloud.begin(Operation::ServerDelete)?;
        self.cloud
            .servers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DriverError::not_found("server", id))
    }
}

#[async_trait]
impl MessageDriver for MemoryClient {
    async fn queue_create(&self, spec: QueueSpec) -> DriverResult<()> {
        self.cloud.begin(Operation::QueueCreate)?;
        self.cloud.queues.insert(spec.name.clone(), spec);
        Ok(())
    }

    async fn queue_delete(&self, name: &str) -> DriverResult<()> {
        self.cloud.begin(Operation::QueueDelete)?;
        self.cloud.queues.remove(name);
        self.cloud.subscriptions.retain(|_, s| s.queue_name != name);
        Ok(())
    }

    async fn subscription_create(&self, queue_name: &str, spec: SubscriptionSpec) -> DriverResult<Subscription> {
        self.cloud.begin(Operation::SubscriptionCreate)?;
        if !self.cloud.queues.contains_key(queue_name) {
            return Err(DriverError::not_found("queue", queue_name));
        }

        let subscription = Subscription {
            subscription_id: uuid::Uuid::new_v4().to_string(),
            queue_name: queue_name.to_string(),
            subscriber: spec.subscriber,
            ttl: spec.ttl,
            options: spec.options,
        };
        self.cloud
            .subscriptions
            .insert(subscription.subscription_id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn subscription_delete(&self, queue_name: &str, subscription_id: &str) -> DriverResult<()> {
        self.cloud.begin(Operation::SubscriptionDelete)?;
        self.cloud
            .subscriptions
            .remove_if(subscription_id, |_, s| s.queue_name == queue_name);
        Ok(())
    }
}

#[async_trait]
impl IdentityDriver for MemoryClient {
    async fn trust_get_by_trustor(&self, trustor: &str, trustee: &str, project: &str) -> DriverResult<Option<Trust>> {
        self.cloud.begin(Operation::TrustGet)?;
        Ok(self
            .cloud
            .trusts
            .iter()
            .find(|t| t.trustor == trustor && t.trustee == trustee && t.project == project)
            .map(|t| t.value().clone()))
    }

    async fn trust_create(&self, trustor: &str, trustee: &str, project: &str, roles: &[String]) -> DriverResult<Trust> {
        self.cloud.begin(Operation::TrustCreate)?;
        let trust = Trust {
            id: uuid::Uuid::new_v4().to_string(),
            trustor: trustor.to_string(),
            trustee: trustee.to_string(),
            project: project.to_string(),
            roles: roles.to_vec(),
        };
        self.cloud.trusts.insert(trust.id.clone(), trust.clone());
        Ok(trust)
    }

    async fn endpoint_get(&self, service_type: &str, interface: &str) -> DriverResult<Option<String>> {
        self.cloud.begin(Operation::EndpointGet)?;
        Ok(self
            .cloud
            .endpoints
            .get(&(service_type.to_string(), interface.to_string()))
            .map(|e| e.clone()))
    }
}

#[async_trait]
impl SessionResolver for InMemoryCloud {
    async fn user_id(&self, credentials: &SessionCredentials) -> DriverResult<String> {
        self.begin(Operation::SessionUserId)?;
        self.service_users
            .get(&credentials.username)
            .map(|id| id.clone())
            .ok_or_else(|| DriverError::not_found("user", credentials.username.clone()))
    }
}

/// Factory handing out [`MemoryClient`]s over one shared cloud
pub struct MemoryDriverFactory {
    cloud: Arc<InMemoryCloud>,
    built: Mutex<Vec<ConnectionParams>>,
}

impl MemoryDriverFactory {
    pub fn new(cloud: Arc<InMemoryCloud>) -> Self {
        Self {
            cloud,
            built: Mutex::new(Vec::new()),
        }
    }

    pub fn cloud(&self) -> &Arc<InMemoryCloud> {
        &self.cloud
    }

    /// Parameters of every client built so far, in order
    pub fn built(&self) -> Vec<ConnectionParams> {
        self.built.lock().map(|b| b.clone()).unwrap_or_default()
    }

    fn client(&self, params: &ConnectionParams) -> Arc<MemoryClient> {
        if let Ok(mut built) = self.built.lock() {
            built.push(params.clone());
        }
        debug!(user = %params.user_id, project = %params.project_id, "Building memory client");
        Arc::new(MemoryClient::new(self.cloud.clone(), params.clone()))
    }
}

impl DriverFactory for MemoryDriverFactory {
    fn name(&self) -> &str {
        "memory"
    }

    fn compute(&self, params: &ConnectionParams) -> DriverResult<Arc<dyn ComputeDriver>> {
        Ok(self.client(params))
    }

    fn message(&self, params: &ConnectionParams) -> DriverResult<Arc<dyn MessageDriver>> {
        Ok(self.client(params))
    }

    fn identity(&self, params: &ConnectionParams) -> DriverResult<Arc<dyn IdentityDriver>> {
        Ok(self.client(params))
    }

    fn session_resolver(&self) -> Arc<dyn SessionResolver> {
        self.cloud.clone()
    }
}
