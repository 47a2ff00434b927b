//! Walks a message receiver through initialise, external view and release
//! against the in-memory backends.

use flotilla_config::EngineConfig;
use flotilla_drivers::{DriverError, InMemoryCloud, MemoryDriverFactory, Operation};
use flotilla_receivers::{MessageReceiver, ReceiverError, SubResource, SubscriberUrlBuilder};
use flotilla_types::{ClusterId, Receiver, ReceiverId, ReceiverType, RequestContext};
use std::sync::Arc;

fn engine() -> (Arc<InMemoryCloud>, Arc<MemoryDriverFactory>, Arc<EngineConfig>) {
    let cloud = Arc::new(InMemoryCloud::new());
    cloud.add_service_user("zaqar", "zaqar-id");
    cloud.add_endpoint("clustering", "public", "http://flotilla.example:8778/v1/");
    let factory = Arc::new(MemoryDriverFactory::new(cloud.clone()));
    (cloud, factory, Arc::new(EngineConfig::default()))
}

fn receiver(id: &str) -> Receiver {
    Receiver::new(ReceiverType::Message, "scale-out", "alice", "ops")
        .with_id(ReceiverId::new(id))
        .with_target(ClusterId::new("cluster-1"), "CLUSTER_SCALE_OUT")
}

#[tokio::test]
async fn test_channel_round_trip() {
    let (cloud, factory, config) = engine();
    let context = RequestContext::new("alice", "ops").with_roles(["member"]);
    let mut mr = MessageReceiver::new(receiver("abc"), config, factory);

    let view = mr.initialize_channel(&context).await.unwrap();
    assert_eq!(view.queue_name, "flotilla-receiver-abc");

    // Discovered endpoint is used as the callback base
    let subscriptions = cloud.subscriptions_for("flotilla-receiver-abc");
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(
        subscriptions[0].subscriber,
        "trust+http://flotilla.example:8778/v1/receivers/abc/notify"
    );

    let external = serde_json::to_value(mr.to_view()).unwrap();
    assert_eq!(external["type"], "message");
    assert_eq!(external["cluster_id"], "cluster-1");
    assert_eq!(external["channel"]["queue_name"], "flotilla-receiver-abc");
    assert!(!external.to_string().contains(&subscriptions[0].subscription_id));

    mr.release_channel(&context).await.unwrap();
    assert!(cloud.queue("flotilla-receiver-abc").is_none());
    assert!(cloud.subscriptions_for("flotilla-receiver-abc").is_empty());

    let receiver = mr.into_receiver();
    assert!(receiver.channel.is_none());
    assert_eq!(receiver.notifier_roles, vec!["member"]);
}

#[tokio::test]
async fn test_two_receivers_share_one_trust() {
    let (cloud, factory, config) = engine();
    let context = RequestContext::new("alice", "ops").with_roles(["admin", "member"]);

    let mut first = MessageReceiver::new(receiver("one"), config.clone(), factory.clone());
    let mut second = MessageReceiver::new(receiver("two"), config, factory);
    first.initialize_channel(&context).await.unwrap();
    second.initialize_channel(&context).await.unwrap();

    let trusts = cloud.trusts();
    assert_eq!(trusts.len(), 1);
    assert_eq!(trusts[0].roles, vec!["member"]);
    assert_eq!(cloud.calls(Operation::TrustCreate), 1);
}

#[tokio::test]
async fn test_interrupted_release_can_be_retried() {
    let (cloud, factory, config) = engine();
    let context = RequestContext::new("alice", "ops").with_roles(["member"]);
    let mut mr = MessageReceiver::new(receiver("xyz"), config, factory)
        .with_subscriber_urls(SubscriberUrlBuilder::new(Some("web.com".into()), 1234));
    mr.initialize_channel(&context).await.unwrap();

    cloud.fail_next(Operation::SubscriptionDelete, DriverError::Unavailable("bus down".into()));
    let err = mr.release_channel(&context).await.unwrap_err();
    assert!(matches!(
        err,
        ReceiverError::ResourceDeletion { resource: SubResource::Subscription, .. }
    ));
    assert!(cloud.queue("flotilla-receiver-xyz").is_some());

    mr.release_channel(&context).await.unwrap();
    assert!(cloud.queue("flotilla-receiver-xyz").is_none());
    assert!(mr.channel_view().is_none());
}
