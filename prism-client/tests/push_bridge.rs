// prism-client/tests/push_bridge.rs
// Integration tests for the push event bridge over the in-memory channel

use std::sync::Arc;
use std::time::Duration;

use prism_client::{ConnectionState, Credential, ImageStore, MemoryChannelHub, PushBridge};
use shared::message::{JobFailedPayload, NotificationLevel, PushMessage};
use shared::models::{Image, TransformStep, Transformation, TransformedImage};

fn image(id: &str) -> Image {
    Image {
        id: id.to_string(),
        original_name: format!("{id}.jpg"),
        size: 2048,
        secure_url: format!("https://cdn.example/{id}.jpg"),
        created_at: 0,
        updated_at: 0,
        is_public: true,
        downloads_count: 0,
        likes: vec![],
        transformed_images: vec![],
    }
}

fn job_result(id: &str, owner: &str) -> TransformedImage {
    TransformedImage {
        id: id.to_string(),
        original_image_id: owner.to_string(),
        parent_id: None,
        size: 512,
        secure_url: format!("https://cdn.example/{id}.jpg"),
        transformation: Transformation {
            order: vec![TransformStep::Grayscale],
            resize: None,
            crop: None,
            rotate: None,
            grayscale: Some(true),
            tint: None,
        },
        created_at: 0,
        updated_at: 0,
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn setup(images: Vec<Image>) -> (Arc<ImageStore>, MemoryChannelHub, Arc<PushBridge>) {
    let store = ImageStore::new();
    store.replace_all(images);
    let hub = MemoryChannelHub::new();
    let bridge = PushBridge::new(store.clone(), Arc::new(hub.clone()));
    (store, hub, bridge)
}

async fn connect(bridge: &Arc<PushBridge>, hub: &MemoryChannelHub, user: &str) {
    bridge
        .set_credential(Some(Credential::new(user, "token")))
        .await;
    wait_for(
        || bridge.connection_state() == ConnectionState::Connected && hub.connection_count() == 1,
        "push connection",
    )
    .await;
}

#[tokio::test]
async fn test_no_connection_without_credential() {
    let (_store, hub, bridge) = setup(vec![image("a")]);
    assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
    assert_eq!(hub.connection_count(), 0);
}

#[tokio::test]
async fn test_job_succeeded_appends_and_notifies() {
    let (store, hub, bridge) = setup(vec![image("a")]);
    let mut notifications = bridge.subscribe_notifications();
    connect(&bridge, &hub, "u-1").await;

    hub.publish(PushMessage::job_succeeded(&job_result("t-1", "a")));

    let notification = tokio::time::timeout(Duration::from_secs(2), notifications.recv())
        .await
        .expect("no notification")
        .unwrap();
    assert_eq!(notification.level, NotificationLevel::Info);
    // The payload carries the record so the UI can navigate to it
    let data = notification.data.unwrap();
    assert_eq!(data.get("id").unwrap().as_str().unwrap(), "t-1");

    let img = store.get("a").unwrap();
    assert_eq!(img.transformed_images.len(), 1);
    assert_eq!(img.transformed_images[0].id, "t-1");
}

#[tokio::test]
async fn test_duplicate_delivery_suppressed() {
    let (store, hub, bridge) = setup(vec![image("a")]);
    let mut notifications = bridge.subscribe_notifications();
    connect(&bridge, &hub, "u-1").await;

    let msg = PushMessage::job_succeeded(&job_result("t-1", "a"));
    hub.publish(msg.clone());
    hub.publish(msg);

    // First delivery notifies...
    tokio::time::timeout(Duration::from_secs(2), notifications.recv())
        .await
        .expect("no notification")
        .unwrap();
    // ...the duplicate does not
    assert!(
        tokio::time::timeout(Duration::from_millis(100), notifications.recv())
            .await
            .is_err()
    );

    assert_eq!(store.get("a").unwrap().transformed_images.len(), 1);
}

#[tokio::test]
async fn test_event_for_unknown_owner_dropped() {
    let (store, hub, bridge) = setup(vec![image("a")]);
    let mut notifications = bridge.subscribe_notifications();
    connect(&bridge, &hub, "u-1").await;

    hub.publish(PushMessage::job_succeeded(&job_result("t-1", "ghost")));

    assert!(
        tokio::time::timeout(Duration::from_millis(100), notifications.recv())
            .await
            .is_err()
    );
    assert!(store.get("a").unwrap().transformed_images.is_empty());
}

#[tokio::test]
async fn test_event_before_store_loads_dropped() {
    let store = ImageStore::new();
    let hub = MemoryChannelHub::new();
    let bridge = PushBridge::new(store.clone(), Arc::new(hub.clone()));
    connect(&bridge, &hub, "u-1").await;

    hub.publish(PushMessage::job_succeeded(&job_result("t-1", "a")));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.read().is_none());
}

#[tokio::test]
async fn test_job_failed_notifies_without_store_mutation() {
    let (store, hub, bridge) = setup(vec![image("a")]);
    let before = store.read().unwrap();
    let mut notifications = bridge.subscribe_notifications();
    connect(&bridge, &hub, "u-1").await;

    hub.publish(PushMessage::job_failed(&JobFailedPayload {
        message: "pipeline exploded".to_string(),
        image_id: Some("a".to_string()),
    }));

    let notification = tokio::time::timeout(Duration::from_secs(2), notifications.recv())
        .await
        .expect("no notification")
        .unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert!(notification.message.contains("pipeline exploded"));

    // Same collection handle: nothing was mutated
    assert!(Arc::ptr_eq(&before, &store.read().unwrap()));
}

#[tokio::test]
async fn test_same_credential_keeps_connection() {
    let (_store, hub, bridge) = setup(vec![image("a")]);
    connect(&bridge, &hub, "u-1").await;

    bridge
        .set_credential(Some(Credential::new("u-1", "token")))
        .await;

    assert_eq!(bridge.connection_state(), ConnectionState::Connected);
    assert_eq!(hub.connection_count(), 1);
}

#[tokio::test]
async fn test_credential_swap_reconnects() {
    let (store, hub, bridge) = setup(vec![image("a")]);
    connect(&bridge, &hub, "u-1").await;

    bridge
        .set_credential(Some(Credential::new("u-2", "other-token")))
        .await;
    wait_for(
        || bridge.connection_state() == ConnectionState::Connected,
        "reconnect",
    )
    .await;

    // The old reader is gone; exactly one connection serves events
    assert_eq!(hub.connection_count(), 1);
    hub.publish(PushMessage::job_succeeded(&job_result("t-1", "a")));
    wait_for(
        || store.get("a").unwrap().transformed_images.len() == 1,
        "delivery after swap",
    )
    .await;
}

#[tokio::test]
async fn test_credential_loss_disconnects() {
    let (store, hub, bridge) = setup(vec![image("a")]);
    connect(&bridge, &hub, "u-1").await;

    bridge.set_credential(None).await;
    assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
    wait_for(|| hub.connection_count() == 0, "teardown").await;

    // Events published while disconnected are simply missed
    hub.publish(PushMessage::job_succeeded(&job_result("t-1", "a")));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.get("a").unwrap().transformed_images.is_empty());
}
