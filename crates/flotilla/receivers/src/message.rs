//! Message receivers
//!
//! A [`MessageReceiver`] owns the queue + subscription pair through which the
//! message bus notifies a receiver.
//!
//! ```text
//! UNINITIALIZED -> QUEUE_CREATED -> SUBSCRIBED
//!                                        |
//! RELEASED <- QUEUE_DELETING <- UNSUBSCRIBING
//! ```
//!
//! Initialisation is not undone on failure unless the orphan queue policy
//! says so: a queue created before a trust or subscription failure is left
//! in place by default and reported in the log.

use crate::error::{ReceiverError, Result, SubResource};
use crate::subscriber::SubscriberUrlBuilder;
use crate::trust::TrustBroker;
use flotilla_config::{EngineConfig, OrphanQueuePolicy};
use flotilla_drivers::{
    ClientCache, DriverFactory, DriverResult, IdentityDriver, MessageDriver, QueueSpec, SubscriptionSpec,
};
use flotilla_types::{Channel, ChannelView, Receiver, ReceiverView, RequestContext};
use serde_json::{json, Map};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const QUEUE_NAME_PREFIX: &str = "flotilla-receiver-";

pub struct MessageReceiver {
    receiver: Receiver,
    config: Arc<EngineConfig>,
    drivers: Arc<dyn DriverFactory>,
    trust_broker: TrustBroker,
    subscriber_urls: SubscriberUrlBuilder,
    message: ClientCache<dyn MessageDriver>,
    identity: ClientCache<dyn IdentityDriver>,
}

impl MessageReceiver {
    pub fn new(receiver: Receiver, config: Arc<EngineConfig>, drivers: Arc<dyn DriverFactory>) -> Self {
        let trust_broker = TrustBroker::new(drivers.session_resolver(), config.trustee.credentials());
        let subscriber_urls = SubscriberUrlBuilder::from_config(&config.receiver);
        Self {
            receiver,
            config,
            drivers,
            trust_broker,
            subscriber_urls,
            message: ClientCache::new(),
            identity: ClientCache::new(),
        }
    }

    /// Replace the subscriber URL builder derived from configuration
    pub fn with_subscriber_urls(mut self, builder: SubscriberUrlBuilder) -> Self {
        self.subscriber_urls = builder;
        self
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn into_receiver(self) -> Receiver {
        self.receiver
    }

    /// Queue name, derived from the receiver identifier
    pub fn queue_name(&self) -> String {
        format!("{}{}", QUEUE_NAME_PREFIX, self.receiver.id)
    }

    fn message_client(&mut self) -> DriverResult<Arc<dyn MessageDriver>> {
        let params = self
            .config
            .connection_params(&self.receiver.user, &self.receiver.project);
        let drivers = Arc::clone(&self.drivers);
        self.message.get_or_try_init(|| drivers.message(&params))
    }

    fn identity_client(&mut self) -> DriverResult<Arc<dyn IdentityDriver>> {
        let params = self
            .config
            .connection_params(&self.receiver.user, &self.receiver.project);
        let drivers = Arc::clone(&self.drivers);
        self.identity.get_or_try_init(|| drivers.identity(&params))
    }

    /// Provision the queue and its trust-backed subscription
    #[instrument(skip(self, context), fields(receiver_id = %self.receiver.id, request_id = ?context.request_id))]
    pub async fn initialize_channel(&mut self, context: &RequestContext) -> Result<ChannelView> {
        if self.receiver.channel.is_some() {
            return Err(ReceiverError::ChannelExists(self.receiver.id.clone()));
        }
        self.receiver.notifier_roles = context.roles.clone();

        let queue_name = self.queue_name();
        let message = self
            .message_client()
            .map_err(ReceiverError::creation(SubResource::Queue))?;
        let queue = QueueSpec {
            name: queue_name.clone(),
            description: format!("Flotilla receiver {}.", self.receiver.id),
            max_messages_post_size: self.config.receiver.max_message_size,
        };
        message.queue_create(queue).await.map_err(|e| {
            error!(queue = %queue_name, error = %e, "Queue creation failed");
            ReceiverError::creation(SubResource::Queue)(e)
        })?;
        info!(queue = %queue_name, "Queue created");

        let subscription = match self.subscribe(message.as_ref(), &queue_name).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.handle_orphan_queue(message.as_ref(), &queue_name).await;
                return Err(e);
            }
        };

        let channel = Channel {
            queue_name,
            subscription: Some(subscription),
        };
        let view = channel.to_view();
        self.receiver.channel = Some(channel);
        self.receiver.updated_at = Some(chrono::Utc::now());
        Ok(view)
    }

    /// Obtain a trust and subscribe the engine to `queue_name`
    async fn subscribe(&mut self, message: &dyn MessageDriver, queue_name: &str) -> Result<String> {
        let identity = self
            .identity_client()
            .map_err(ReceiverError::creation(SubResource::Trust))?;
        let subscriber = self
            .subscriber_urls
            .build(identity.as_ref(), &self.receiver.id)
            .await;

        let trust = self
            .trust_broker
            .ensure_trust(
                identity.as_ref(),
                &self.receiver.user,
                &self.receiver.project,
                &self.receiver.notifier_roles,
            )
            .await?;

        let mut options = Map::new();
        options.insert("trust_id".into(), json!(trust.id));
        let spec = SubscriptionSpec {
            subscriber: subscriber.clone(),
            ttl: self.config.receiver.subscription_ttl,
            options,
        };

        let subscription = message.subscription_create(queue_name, spec).await.map_err(|e| {
            error!(queue = %queue_name, error = %e, "Subscription creation failed");
            ReceiverError::creation(SubResource::Subscription)(e)
        })?;
        info!(
            queue = %queue_name,
            subscriber = %subscriber,
            trust_id = %trust.id,
            "Subscription created"
        );
        Ok(subscription.subscription_id)
    }

    async fn handle_orphan_queue(&self, message: &dyn MessageDriver, queue_name: &str) {
        match self.config.receiver.orphan_queue_policy {
            OrphanQueuePolicy::Retain => {
                warn!(queue = %queue_name, "Queue left without a subscription");
            }
            OrphanQueuePolicy::Delete => match message.queue_delete(queue_name).await {
                Ok(()) => info!(queue = %queue_name, "Orphaned queue deleted"),
                Err(e) => error!(queue = %queue_name, error = %e, "Orphaned queue could not be deleted"),
            },
        }
    }

    /// Delete the subscription, then the queue.
    ///
    /// A failure stops the sequence and leaves the channel recording what is
    /// still to be released, so calling again resumes where it stopped.
    #[instrument(skip(self, context), fields(receiver_id = %self.receiver.id, request_id = ?context.request_id))]
    pub async fn release_channel(&mut self, context: &RequestContext) -> Result<()> {
        let Some(channel) = self.receiver.channel.clone() else {
            return Err(ReceiverError::NoChannel(self.receiver.id.clone()));
        };

        if let Some(subscription) = &channel.subscription {
            let message = self
                .message_client()
                .map_err(ReceiverError::deletion(SubResource::Subscription, subscription.as_str()))?;
            message
                .subscription_delete(&channel.queue_name, subscription)
                .await
                .map_err(|e| {
                    error!(subscription = %subscription, error = %e, "Subscription deletion failed");
                    ReceiverError::deletion(SubResource::Subscription, subscription.as_str())(e)
                })?;
            info!(queue = %channel.queue_name, "Subscription deleted");

            if let Some(current) = self.receiver.channel.as_mut() {
                current.subscription = None;
            }
        }

        let message = self
            .message_client()
            .map_err(ReceiverError::deletion(SubResource::Queue, channel.queue_name.as_str()))?;
        message.queue_delete(&channel.queue_name).await.map_err(|e| {
            error!(queue = %channel.queue_name, error = %e, "Queue deletion failed");
            ReceiverError::deletion(SubResource::Queue, channel.queue_name.as_str())(e)
        })?;
        info!(queue = %channel.queue_name, "Queue deleted");

        self.receiver.channel = None;
        self.receiver.updated_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// External view of the channel: the queue name only
    pub fn channel_view(&self) -> Option<ChannelView> {
        self.receiver.channel.as_ref().map(Channel::to_view)
    }

    pub fn to_view(&self) -> ReceiverView {
        self.receiver.to_view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_drivers::{DriverError, InMemoryCloud, MemoryDriverFactory, Operation};
    use flotilla_types::{ClusterId, ReceiverId, ReceiverType};

    struct Fixture {
        cloud: Arc<InMemoryCloud>,
        factory: Arc<MemoryDriverFactory>,
    }

    impl Fixture {
        fn new() -> Self {
            let cloud = Arc::new(InMemoryCloud::new());
            cloud.add_service_user("zaqar", "zaqar-id");
            let factory = Arc::new(MemoryDriverFactory::new(cloud.clone()));
            Self { cloud, factory }
        }

        fn receiver_with(&self, config: EngineConfig) -> MessageReceiver {
            let receiver = Receiver::new(ReceiverType::Message, "r1", "user1", "project1")
                .with_id(ReceiverId::new("R1"))
                .with_target(ClusterId::new("c1"), "CLUSTER_SCALE_OUT");
            MessageReceiver::new(receiver, Arc::new(config), self.factory.clone())
                .with_subscriber_urls(SubscriberUrlBuilder::new(Some("web.com".into()), 1234))
        }

        fn receiver(&self) -> MessageReceiver {
            self.receiver_with(EngineConfig::default())
        }
    }

    fn context() -> RequestContext {
        RequestContext::new("user1", "project1").with_roles(["admin", "member"])
    }

    #[tokio::test]
    async fn test_initialize_channel() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();

        let view = mr.initialize_channel(&context()).await.unwrap();
        assert_eq!(view.queue_name, "flotilla-receiver-R1");
        assert_eq!(mr.receiver().notifier_roles, vec!["admin", "member"]);

        let queue = fx.cloud.queue("flotilla-receiver-R1").unwrap();
        assert_eq!(queue.description, "Flotilla receiver R1.");
        assert_eq!(queue.max_messages_post_size, 65535);

        let channel = mr.receiver().channel.clone().unwrap();
        let subscription = fx.cloud.subscription(channel.subscription.as_deref().unwrap()).unwrap();
        assert_eq!(subscription.subscriber, "trust+http://web.com:1234/v1/receivers/R1/notify");

        let trusts = fx.cloud.trusts();
        assert_eq!(trusts.len(), 1);
        assert_eq!(trusts[0].roles, vec!["member"]);
    }

    #[tokio::test]
    async fn test_initialize_twice_rejected() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();
        mr.initialize_channel(&context()).await.unwrap();

        let err = mr.initialize_channel(&context()).await.unwrap_err();
        assert!(matches!(err, ReceiverError::ChannelExists(_)));
        assert_eq!(fx.cloud.calls(Operation::QueueCreate), 1);
    }

    #[tokio::test]
    async fn test_queue_failure_tagged_queue() {
        let fx = Fixture::new();
        fx.cloud
            .fail_next(Operation::QueueCreate, DriverError::Unavailable("bus down".into()));
        let mut mr = fx.receiver();

        let err = mr.initialize_channel(&context()).await.unwrap_err();
        assert_eq!(err.resource(), Some(SubResource::Queue));
        assert_eq!(fx.cloud.calls(Operation::SubscriptionCreate), 0);
        assert!(mr.receiver().channel.is_none());
    }

    #[tokio::test]
    async fn test_subscription_failure_retains_queue_by_default() {
        let fx = Fixture::new();
        fx.cloud
            .fail_next(Operation::SubscriptionCreate, DriverError::Rejected("bad subscriber".into()));
        let mut mr = fx.receiver();

        let err = mr.initialize_channel(&context()).await.unwrap_err();
        assert_eq!(err.resource(), Some(SubResource::Subscription));
        assert!(mr.receiver().channel.is_none());
        assert!(fx.cloud.queue("flotilla-receiver-R1").is_some());
        assert_eq!(fx.cloud.calls(Operation::QueueDelete), 0);
    }

    #[tokio::test]
    async fn test_subscription_failure_deletes_queue_when_configured() {
        let fx = Fixture::new();
        fx.cloud
            .fail_next(Operation::SubscriptionCreate, DriverError::Rejected("bad subscriber".into()));
        let mut config = EngineConfig::default();
        config.receiver.orphan_queue_policy = OrphanQueuePolicy::Delete;
        let mut mr = fx.receiver_with(config);

        let err = mr.initialize_channel(&context()).await.unwrap_err();
        assert_eq!(err.resource(), Some(SubResource::Subscription));
        assert!(fx.cloud.queue("flotilla-receiver-R1").is_none());
    }

    #[tokio::test]
    async fn test_compensating_delete_failure_keeps_original_error() {
        let fx = Fixture::new();
        fx.cloud
            .fail_next(Operation::SubscriptionCreate, DriverError::Rejected("bad subscriber".into()));
        fx.cloud
            .fail_next(Operation::QueueDelete, DriverError::Unavailable("bus down".into()));
        let mut config = EngineConfig::default();
        config.receiver.orphan_queue_policy = OrphanQueuePolicy::Delete;
        let mut mr = fx.receiver_with(config);

        let err = mr.initialize_channel(&context()).await.unwrap_err();
        assert_eq!(err.resource(), Some(SubResource::Subscription));
        assert_eq!(fx.cloud.calls(Operation::QueueDelete), 1);
    }

    #[tokio::test]
    async fn test_trust_failure_tagged_trust() {
        let fx = Fixture::new();
        fx.cloud
            .fail_next(Operation::TrustCreate, DriverError::Rejected("no roles".into()));
        let mut mr = fx.receiver();

        let err = mr.initialize_channel(&context()).await.unwrap_err();
        assert_eq!(err.resource(), Some(SubResource::Trust));
        assert_eq!(fx.cloud.calls(Operation::SubscriptionCreate), 0);
    }

    #[tokio::test]
    async fn test_subscription_ttl_and_trust_option() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();
        mr.initialize_channel(&context()).await.unwrap();

        let subscriptions = fx.cloud.subscriptions_for("flotilla-receiver-R1");
        let trust = fx.cloud.trusts().pop().unwrap();
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].ttl, u64::MAX);
        assert_eq!(subscriptions[0].options, json!({"trust_id": trust.id}).as_object().cloned().unwrap());
        assert_eq!(trust.trustor, "user1");
        assert_eq!(trust.trustee, "zaqar-id");
        assert_eq!(trust.project, "project1");
    }

    #[tokio::test]
    async fn test_subscription_ttl_is_configurable() {
        let fx = Fixture::new();
        let mut config = EngineConfig::default();
        config.receiver.subscription_ttl = 3600;
        let mut mr = fx.receiver_with(config);
        mr.initialize_channel(&context()).await.unwrap();

        let subscriptions = fx.cloud.subscriptions_for("flotilla-receiver-R1");
        assert_eq!(subscriptions[0].ttl, 3600);
    }

    #[tokio::test]
    async fn test_release_channel() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();
        mr.initialize_channel(&context()).await.unwrap();

        mr.release_channel(&context()).await.unwrap();
        assert!(mr.receiver().channel.is_none());
        assert!(fx.cloud.queue("flotilla-receiver-R1").is_none());
        assert!(fx.cloud.subscriptions_for("flotilla-receiver-R1").is_empty());

        let err = mr.release_channel(&context()).await.unwrap_err();
        assert!(matches!(err, ReceiverError::NoChannel(_)));
    }

    #[tokio::test]
    async fn test_subscription_delete_failure_stops_release() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();
        mr.initialize_channel(&context()).await.unwrap();

        fx.cloud
            .fail_next(Operation::SubscriptionDelete, DriverError::Unavailable("bus down".into()));
        let err = mr.release_channel(&context()).await.unwrap_err();
        assert_eq!(err.resource(), Some(SubResource::Subscription));
        assert_eq!(fx.cloud.calls(Operation::QueueDelete), 0);
        assert!(mr.receiver().channel.as_ref().unwrap().subscription.is_some());
    }

    #[tokio::test]
    async fn test_queue_delete_failure_resumes_at_queue() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();
        mr.initialize_channel(&context()).await.unwrap();

        fx.cloud
            .fail_next(Operation::QueueDelete, DriverError::Unavailable("bus down".into()));
        let err = mr.release_channel(&context()).await.unwrap_err();
        assert_eq!(err.resource(), Some(SubResource::Queue));
        assert_eq!(fx.cloud.calls(Operation::SubscriptionDelete), 1);

        let channel = mr.receiver().channel.clone().unwrap();
        assert!(channel.subscription.is_none());
        assert_eq!(channel.queue_name, "flotilla-receiver-R1");

        mr.release_channel(&context()).await.unwrap();
        assert_eq!(fx.cloud.calls(Operation::SubscriptionDelete), 1);
        assert_eq!(fx.cloud.calls(Operation::QueueDelete), 2);
        assert!(mr.receiver().channel.is_none());
    }

    #[tokio::test]
    async fn test_clients_built_once_per_receiver() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();
        mr.initialize_channel(&context()).await.unwrap();
        mr.release_channel(&context()).await.unwrap();

        // One message client and one identity client, both for the owner
        let built = fx.factory.built();
        assert_eq!(built.len(), 2);
        assert!(built.iter().all(|p| p.user_id == "user1" && p.project_id == "project1"));
    }

    #[tokio::test]
    async fn test_view_hides_subscription() {
        let fx = Fixture::new();
        let mut mr = fx.receiver();
        mr.initialize_channel(&context()).await.unwrap();
        let subscription = mr.receiver().channel.clone().unwrap().subscription.unwrap();

        let json = serde_json::to_value(mr.to_view()).unwrap();
        assert_eq!(json["channel"], json!({"queue_name": "flotilla-receiver-R1"}));
        assert!(!json.to_string().contains(&subscription));
        assert_eq!(mr.channel_view().unwrap().queue_name, "flotilla-receiver-R1");
    }
}
