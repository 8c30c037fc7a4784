use super::*;
use notisync_test_utils::notification::*;

fn backend(test_id: &str) -> MemBackend {
    let config = Config::default();
    config
        .set_module_config(&MemBackendModConfig {
            mem_backend: MemBackendConfig {
                test_id: test_id.into(),
                ..Default::default()
            },
        })
        .unwrap();
    MemBackend::from_config(&config).unwrap()
}

#[tokio::test]
async fn list_is_newest_first_and_scoped_to_user() {
    let b = backend("mem-list");
    b.seed([
        notification(1, false, 1),
        notification(3, false, 3),
        NotificationBuilder {
            id: Some(2),
            user_id: Some("other".into()),
            ..Default::default()
        }
        .build(),
    ]);

    let list = b.list(TEST_USER.into(), 20).await.unwrap();
    assert_eq!(vec![3, 1], ids(&list));

    let list = b.list(TEST_USER.into(), 1).await.unwrap();
    assert_eq!(vec![3], ids(&list));
    assert_eq!(2, b.list_calls());
}

#[tokio::test]
async fn induced_failures_are_counted_down() {
    let b = backend("mem-fail");
    b.set_fail(2);

    assert!(b.list(TEST_USER.into(), 20).await.is_err());
    assert!(b.mark_all_read(TEST_USER.into()).await.is_err());
    assert!(b.list(TEST_USER.into(), 20).await.is_ok());
}

#[tokio::test]
async fn writes_replicate_to_subscribers() {
    let b = backend("mem-live");
    let user: UserId = TEST_USER.into();
    let mut sub = b.subscribe(user.clone()).await.unwrap();

    b.push(notification(5, false, 5));
    let ev = sub.recv_event().await.unwrap();
    assert_eq!(LiveEventKind::Insert, ev.kind);
    assert_eq!(5, ev.record.id.0);

    b.mark_read(user.clone(), NotificationId(5)).await.unwrap();
    let ev = sub.recv_event().await.unwrap();
    assert_eq!(LiveEventKind::Update, ev.kind);
    assert!(ev.record.is_read);

    // already read, no further event
    b.mark_read(user.clone(), NotificationId(5)).await.unwrap();
    b.push(notification(6, false, 6));
    let ev = sub.recv_event().await.unwrap();
    assert_eq!(6, ev.record.id.0);
}

#[tokio::test]
async fn mark_read_of_unknown_id_fails() {
    let b = backend("mem-unknown");
    assert!(b
        .mark_read(TEST_USER.into(), NotificationId(77))
        .await
        .is_err());
}

#[tokio::test]
async fn dropped_subscriptions_are_closed() {
    let b = backend("mem-drop");
    let user: UserId = TEST_USER.into();

    let sub = b.subscribe(user.clone()).await.unwrap();
    assert_eq!(1, b.subscriber_count(&user));

    drop(sub);
    assert_eq!(0, b.subscriber_count(&user));

    // sending prunes the closed sender
    b.push(notification(1, false, 1));
    assert!(b.hub.lock().unwrap().subs[&user].is_empty());
}

#[test]
fn handles_with_same_test_id_share_a_store() {
    let a = backend("mem-share");
    let b = backend("mem-share");
    a.seed([notification(1, false, 1)]);
    assert_eq!(vec![1], ids(&b.stored(&TEST_USER.into())));
}
