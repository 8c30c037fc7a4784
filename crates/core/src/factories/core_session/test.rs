use super::*;
use crate::factories::*;
use notisync_test_utils::iter_check;
use notisync_test_utils::notification::*;
use std::time::Duration;

struct Harness {
    builder: Arc<Builder>,
    mem: MemBackend,
    backend: DynBackend,
    live: DynLive,
    cache: DynCache,
}

impl Harness {
    async fn new(test_id: &str) -> Self {
        Self::with_fetcher(test_id, CoreFetcherConfig::default()).await
    }

    async fn with_fetcher(test_id: &str, fetcher: CoreFetcherConfig) -> Self {
        let builder = crate::default_test_builder()
            .with_default_config()
            .unwrap();
        builder
            .config
            .set_module_config(&MemBackendModConfig {
                mem_backend: MemBackendConfig {
                    test_id: test_id.into(),
                    ..Default::default()
                },
            })
            .unwrap();
        builder
            .config
            .set_module_config(&CoreFetcherModConfig {
                core_fetcher: fetcher,
            })
            .unwrap();
        let builder = builder.build().unwrap();

        let mem = MemBackend::from_config(&builder.config).unwrap();
        let backend = builder.backend.create(builder.clone()).await.unwrap();
        let live = builder.live.create(builder.clone()).await.unwrap();
        let cache = builder.cache.create(builder.clone()).await.unwrap();

        Self {
            builder,
            mem,
            backend,
            live,
            cache,
        }
    }

    async fn mount(&self, user: Option<&str>) -> DynSession {
        self.builder
            .session
            .create(
                self.builder.clone(),
                self.backend.clone(),
                self.live.clone(),
                self.cache.clone(),
                user.map(UserId::from),
            )
            .await
            .unwrap()
    }
}

async fn wait_phase(session: &DynSession, phase: Phase) {
    iter_check!({
        if session.phase() == phase {
            break;
        }
    });
}

fn fast_fetcher(max_retries: usize) -> CoreFetcherConfig {
    CoreFetcherConfig {
        max_retries,
        backoff_base_ms: 10,
        ..Default::default()
    }
}

#[tokio::test]
async fn mount_loads_newest_first() {
    let h = Harness::new("session-load").await;
    h.mem.seed([
        notification(1, false, 1),
        notification(3, true, 3),
        notification(2, false, 2),
    ]);

    let s = h.mount(Some(TEST_USER)).await;
    assert_eq!(Some(TEST_USER.into()), s.user());

    wait_phase(&s, Phase::Ready).await;
    assert_eq!(vec![3, 2, 1], ids(&s.notifications()));
    assert_eq!(2, s.unread_count());
    assert!(!s.is_loading());
    assert!(s.error().is_none());
}

#[tokio::test]
async fn mount_without_user_is_idle() {
    let h = Harness::new("session-no-user").await;
    h.mem.seed([notification(1, false, 1)]);

    let s = h.mount(None).await;
    assert_eq!(Phase::Idle, s.phase());
    assert_eq!(0, s.unread_count());

    assert!(matches!(
        s.mark_as_read(NotificationId(1)).await,
        Err(NsError::MissingUser)
    ));
    assert!(matches!(s.mark_all_as_read().await, Err(NsError::MissingUser)));

    s.retry();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(Phase::Idle, s.phase());
    assert_eq!(0, h.mem.list_calls());
}

#[tokio::test]
async fn read_all_then_new_notification() {
    let h = Harness::new("session-read-all").await;
    h.mem.seed([
        notification(1, false, 1),
        notification(2, false, 2),
        notification(3, false, 3),
    ]);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;
    assert_eq!(3, s.unread_count());

    s.mark_all_as_read().await.unwrap();
    assert_eq!(0, s.unread_count());

    h.mem.push(notification(4, false, 4));
    iter_check!({
        if s.unread_count() == 1 {
            break;
        }
    });

    let list = s.notifications();
    assert_eq!(vec![4, 3, 2, 1], ids(&list));
    assert!(!list[0].is_read);
    assert!(list[1..].iter().all(|n| n.is_read));
}

#[tokio::test]
async fn mark_as_read_applies_after_confirmation() {
    let h = Harness::new("session-mark-one").await;
    h.mem.seed([notification(1, false, 1), notification(2, false, 2)]);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;

    s.mark_as_read(NotificationId(2)).await.unwrap();
    assert_eq!(1, s.unread_count());
    assert!(s.notifications()[0].is_read);
    assert!(h.mem.stored(&TEST_USER.into())[0].is_read);

    // the replicated update is a no-op
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(1, s.unread_count());
}

#[tokio::test]
async fn rejected_mutation_leaves_state_alone() {
    let h = Harness::new("session-mark-fail").await;
    h.mem.seed([notification(1, false, 1)]);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;

    h.mem.set_fail(2);
    assert!(matches!(
        s.mark_as_read(NotificationId(1)).await,
        Err(NsError::Mutation { .. })
    ));
    assert!(matches!(
        s.mark_all_as_read().await,
        Err(NsError::Mutation { .. })
    ));

    assert_eq!(1, s.unread_count());
    assert_eq!(Phase::Ready, s.phase());
    assert!(s.error().is_none());
}

#[tokio::test]
async fn mark_unknown_id_surfaces_backend_rejection() {
    let h = Harness::new("session-mark-unknown").await;
    h.mem.seed([notification(1, false, 1)]);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;

    assert!(s.mark_as_read(NotificationId(99)).await.is_err());
    assert_eq!(vec![1], ids(&s.notifications()));
}

#[tokio::test]
async fn live_inserts_are_capped_and_ordered() {
    let h = Harness::new("session-cap").await;
    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;
    assert!(s.notifications().is_empty());

    for id in 1..=25 {
        h.mem.push(notification(id, false, id));
    }
    iter_check!({
        if s.notifications().first().map(|n| n.id.0) == Some(25) {
            break;
        }
    });

    let list = s.notifications();
    assert_eq!(MAX_LIST_LEN, list.len());
    assert!(is_newest_first(&list));
    assert_eq!((6..=25).rev().collect::<Vec<_>>(), ids(&list));
}

#[tokio::test]
async fn updates_from_elsewhere_never_unread() {
    let h = Harness::new("session-update").await;
    h.mem.seed([notification(1, false, 1), notification(2, false, 2)]);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;

    // another device reads it
    h.mem
        .mark_read(TEST_USER.into(), NotificationId(1))
        .await
        .unwrap();
    iter_check!({
        if s.unread_count() == 1 {
            break;
        }
    });

    // a stale update must not flip it back
    let stale = LiveEvent::update(notification(1, false, 1));
    h.mem.send_raw(&TEST_USER.into(), stale.encode().unwrap());
    h.mem.push(notification(3, false, 3));
    iter_check!({
        if s.notifications().len() == 3 {
            break;
        }
    });
    assert_eq!(2, s.unread_count());
    assert!(s.notifications()[2].is_read);
}

#[tokio::test]
async fn invalid_live_payloads_are_ignored() {
    let h = Harness::new("session-garbage").await;
    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;

    let user: UserId = TEST_USER.into();
    h.mem.send_raw(&user, bytes::Bytes::from_static(b"garbage"));
    let foreign = NotificationBuilder {
        id: Some(7),
        user_id: Some("someone-else".into()),
        ..Default::default()
    }
    .build();
    h.mem
        .send_raw(&user, LiveEvent::insert(foreign).encode().unwrap());
    h.mem.push(notification(8, false, 8));

    iter_check!({
        if !s.notifications().is_empty() {
            break;
        }
    });
    assert_eq!(vec![8], ids(&s.notifications()));
}

#[tokio::test(start_paused = true)]
async fn errored_fetch_then_retry() {
    let h = Harness::with_fetcher("session-retry", fast_fetcher(1)).await;
    h.mem.seed([notification(1, false, 1)]);
    h.mem.set_fail(2);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Errored).await;
    assert_eq!(2, h.mem.list_calls());
    assert!(matches!(s.error(), Some(NsError::Fetch { .. })));
    assert!(s.notifications().is_empty());

    s.retry();
    assert!(s.is_loading());
    wait_phase(&s, Phase::Ready).await;
    assert!(s.error().is_none());
    assert_eq!(vec![1], ids(&s.notifications()));
    assert_eq!(3, h.mem.list_calls());
}

#[tokio::test]
async fn retry_bypasses_the_cache() {
    let h = Harness::new("session-retry-cache").await;
    h.mem.seed([notification(1, false, 1)]);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;
    assert_eq!(1, h.mem.list_calls());

    h.mem.seed([notification(2, false, 2)]);
    s.retry();
    wait_phase(&s, Phase::Ready).await;
    iter_check!({
        if s.notifications().len() == 2 {
            break;
        }
    });
    assert_eq!(2, h.mem.list_calls());
}

#[tokio::test]
async fn second_mount_is_served_from_cache() {
    let h = Harness::new("session-cache").await;
    h.mem.seed([notification(1, false, 1)]);

    let a = h.mount(Some(TEST_USER)).await;
    wait_phase(&a, Phase::Ready).await;
    a.mark_as_read(NotificationId(1)).await.unwrap();
    a.unmount();

    let b = h.mount(Some(TEST_USER)).await;
    wait_phase(&b, Phase::Ready).await;
    assert_eq!(1, h.mem.list_calls());

    // the cache carries the locally applied read flag
    assert_eq!(0, b.unread_count());
}

#[tokio::test(start_paused = true)]
async fn unmount_during_fetch_freezes_state() {
    let h = Harness::new("session-unmount").await;
    h.mem.seed([notification(1, false, 1)]);
    h.mem.set_list_delay(Duration::from_secs(1));

    let s = h.mount(Some(TEST_USER)).await;
    assert!(s.is_loading());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(1, h.mem.subscriber_count(&TEST_USER.into()));

    s.unmount();
    assert_eq!(Phase::Idle, s.phase());
    assert_eq!(None, s.user());

    let mut rx = s.watch();
    rx.borrow_and_update();

    tokio::time::sleep(Duration::from_secs(5)).await;
    h.mem.push(notification(2, false, 2));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!rx.has_changed().unwrap());
    assert_eq!(Phase::Idle, s.phase());
    assert!(s.notifications().is_empty());
    assert_eq!(0, h.mem.subscriber_count(&TEST_USER.into()));
    assert!(h.cache.get(&TEST_USER.into()).is_none());
}

#[tokio::test(start_paused = true)]
async fn switching_user_discards_the_old_fetch() {
    let h = Harness::new("session-switch").await;
    let other = NotificationBuilder {
        id: Some(10),
        user_id: Some("other".into()),
        ..Default::default()
    }
    .build();
    h.mem.seed([notification(1, false, 1), other]);
    h.mem.set_list_delay(Duration::from_secs(1));

    let s = h.mount(Some(TEST_USER)).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    s.set_user(Some("other".into()));
    assert!(s.is_loading());
    assert!(s.notifications().is_empty());

    wait_phase(&s, Phase::Ready).await;
    assert_eq!(vec![10], ids(&s.notifications()));

    // events for the old user do not leak in
    h.mem.push(notification(2, false, 2));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(vec![10], ids(&s.notifications()));
}

#[tokio::test(start_paused = true)]
async fn events_during_load_are_replayed() {
    let h = Harness::new("session-buffer").await;
    h.mem.seed([notification(1, false, 1), notification(2, false, 2)]);
    h.mem.set_list_delay(Duration::from_secs(1));

    let s = h.mount(Some(TEST_USER)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(s.is_loading());

    h.mem
        .mark_read(TEST_USER.into(), NotificationId(1))
        .await
        .unwrap();
    h.mem.push(notification(3, false, 3));

    wait_phase(&s, Phase::Ready).await;
    let list = s.notifications();
    assert_eq!(vec![3, 2, 1], ids(&list));
    assert_eq!(2, s.unread_count());
}

#[tokio::test]
async fn set_same_user_is_a_noop() {
    let h = Harness::new("session-same-user").await;
    h.mem.seed([notification(1, false, 1)]);

    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;

    s.set_user(Some(TEST_USER.into()));
    assert_eq!(Phase::Ready, s.phase());
    assert_eq!(1, h.mem.list_calls());
}

#[tokio::test]
async fn watch_sees_changes() {
    let h = Harness::new("session-watch").await;
    let s = h.mount(Some(TEST_USER)).await;
    let mut rx = s.watch();

    wait_phase(&s, Phase::Ready).await;
    rx.borrow_and_update();

    h.mem.push(notification(1, false, 1));
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(1, rx.borrow().unread_count());
}

#[tokio::test]
async fn dropping_the_session_unsubscribes() {
    let h = Harness::new("session-drop").await;
    let s = h.mount(Some(TEST_USER)).await;
    wait_phase(&s, Phase::Ready).await;
    assert_eq!(1, h.mem.subscriber_count(&TEST_USER.into()));

    drop(s);
    iter_check!({
        if h.mem.subscriber_count(&TEST_USER.into()) == 0 {
            break;
        }
    });
}

#[test]
fn validate_rejects_zero_caps() {
    let builder = crate::default_test_builder().with_default_config().unwrap();
    builder
        .config
        .set_module_config(&CoreSessionModConfig {
            core_session: CoreSessionConfig {
                max_list_len: 0,
                ..Default::default()
            },
        })
        .unwrap();
    assert!(builder.build().is_err());

    let builder = crate::default_test_builder().with_default_config().unwrap();
    builder
        .config
        .set_module_config(&CoreFetcherModConfig {
            core_fetcher: CoreFetcherConfig {
                list_limit: 0,
                ..Default::default()
            },
        })
        .unwrap();
    assert!(builder.build().is_err());
}
