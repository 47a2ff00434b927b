//! Subscriber URLs
//!
//! The message bus delivers notifications to
//! `trust+<base>/receivers/<id>/notify`. The `trust+` scheme prefix tells the
//! bus to authenticate its callback with a trust-scoped token.
//!
//! The base URL comes from, in order: the configured callback host, the
//! engine's public endpoint in the service catalog, the local host name.

use flotilla_config::ReceiverConfig;
use flotilla_drivers::IdentityDriver;
use flotilla_types::ReceiverId;
use tracing::{debug, warn};

/// Catalog entry the engine's own API is registered under
const CATALOG_SERVICE_TYPE: &str = "clustering";
const CATALOG_INTERFACE: &str = "public";

#[derive(Debug, Clone)]
pub struct SubscriberUrlBuilder {
    host: Option<String>,
    port: u16,
    local_host: Option<String>,
}

impl SubscriberUrlBuilder {
    pub fn new(host: Option<String>, port: u16) -> Self {
        Self {
            host,
            port,
            local_host: None,
        }
    }

    pub fn from_config(config: &ReceiverConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            local_host: config.local_host.clone(),
        }
    }

    /// Host name to fall back on instead of asking the operating system
    pub fn with_local_host(mut self, local_host: impl Into<String>) -> Self {
        self.local_host = Some(local_host.into());
        self
    }

    /// Base URL of the engine API, without a trailing slash
    pub async fn base_url(&self, identity: &dyn IdentityDriver) -> String {
        if let Some(host) = self.host.as_deref().filter(|h| !h.is_empty()) {
            return format!("http://{}:{}/v1", host, self.port);
        }

        let discovered = identity
            .endpoint_get(CATALOG_SERVICE_TYPE, CATALOG_INTERFACE)
            .await
            .map(|endpoint| endpoint.filter(|e| !e.trim().is_empty()));
        match discovered {
            Ok(Some(endpoint)) => {
                debug!(endpoint = %endpoint, "Using catalog endpoint for subscriber");
                endpoint.trim().trim_end_matches('/').to_string()
            }
            Ok(None) => self.local_base("no catalog endpoint"),
            Err(e) => self.local_base(&e.to_string()),
        }
    }

    fn local_base(&self, reason: &str) -> String {
        let host = self.local_host.clone().unwrap_or_else(local_host_name);
        warn!(reason, host = %host, "Falling back to local host name for subscriber URL");
        format!("http://{}:{}/v1", host, self.port)
    }

    /// Full `trust+` subscriber URL for a receiver
    pub async fn build(&self, identity: &dyn IdentityDriver, receiver_id: &ReceiverId) -> String {
        let base = self.base_url(identity).await;
        format!("trust+{}/receivers/{}/notify", base, receiver_id)
    }
}

/// Name of this host as reported by the operating system
fn local_host_name() -> String {
    match hostname::get() {
        Ok(name) => {
            let name = name.to_string_lossy().trim().to_string();
            if name.is_empty() {
                "localhost".to_string()
            } else {
                name
            }
        }
        Err(e) => {
            warn!(error = %e, "Host name lookup failed");
            "localhost".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_drivers::{
        ConnectionParams, DriverError, DriverFactory, InMemoryCloud, MemoryDriverFactory, Operation,
    };
    use std::sync::Arc;

    fn identity(cloud: &Arc<InMemoryCloud>) -> Arc<dyn IdentityDriver> {
        MemoryDriverFactory::new(cloud.clone())
            .identity(&ConnectionParams::new("http://identity", "u", "p"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_configured_host() {
        let cloud = Arc::new(InMemoryCloud::new());
        let builder = SubscriberUrlBuilder::new(Some("web.com".into()), 1234);

        let url = builder.build(identity(&cloud).as_ref(), &ReceiverId::new("U")).await;
        assert_eq!(url, "trust+http://web.com:1234/v1/receivers/U/notify");
        assert_eq!(cloud.calls(Operation::EndpointGet), 0);
    }

    #[tokio::test]
    async fn test_discovered_endpoint() {
        let cloud = Arc::new(InMemoryCloud::new());
        cloud.add_endpoint("clustering", "public", "http://b:1/v1");
        let builder = SubscriberUrlBuilder::new(None, 8778);

        let url = builder.build(identity(&cloud).as_ref(), &ReceiverId::new("U")).await;
        assert_eq!(url, "trust+http://b:1/v1/receivers/U/notify");
    }

    #[tokio::test]
    async fn test_local_host_fallback_on_discovery_failure() {
        let cloud = Arc::new(InMemoryCloud::new());
        cloud.add_endpoint("clustering", "public", "http://b:1/v1");
        cloud.fail_next(Operation::EndpointGet, DriverError::Unavailable("catalog down".into()));
        let builder = SubscriberUrlBuilder::new(None, 8778).with_local_host("h");

        let url = builder.build(identity(&cloud).as_ref(), &ReceiverId::new("U")).await;
        assert_eq!(url, "trust+http://h:8778/v1/receivers/U/notify");
    }

    #[tokio::test]
    async fn test_blank_catalog_endpoint_falls_back() {
        let cloud = Arc::new(InMemoryCloud::new());
        cloud.add_endpoint("clustering", "public", "");
        let builder = SubscriberUrlBuilder::new(None, 8778).with_local_host("h");

        let url = builder.build(identity(&cloud).as_ref(), &ReceiverId::new("U")).await;
        assert_eq!(url, "trust+http://h:8778/v1/receivers/U/notify");
    }

    #[tokio::test]
    async fn test_local_host_fallback_without_endpoint() {
        let cloud = Arc::new(InMemoryCloud::new());
        let builder = SubscriberUrlBuilder::new(None, 8778).with_local_host("h");

        let url = builder.build(identity(&cloud).as_ref(), &ReceiverId::new("U")).await;
        assert_eq!(url, "trust+http://h:8778/v1/receivers/U/notify");
    }

    #[tokio::test]
    async fn test_from_config_defaults_to_os_host_name() {
        let cloud = Arc::new(InMemoryCloud::new());
        let builder = SubscriberUrlBuilder::from_config(&ReceiverConfig::default());

        let url = builder.build(identity(&cloud).as_ref(), &ReceiverId::new("U")).await;
        assert!(url.starts_with("trust+http://"));
        assert!(url.ends_with(":8778/v1/receivers/U/notify"));
    }

    #[test]
    fn test_local_host_name_from_os() {
        let name = local_host_name();
        assert!(!name.is_empty());
        assert_eq!(name, name.trim());
    }
}
