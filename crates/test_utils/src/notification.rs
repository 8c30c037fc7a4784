//! Test utilities associated with notifications.

use notisync_api::*;
use std::sync::atomic::{AtomicI64, Ordering};

/// The user most tests operate on.
pub const TEST_USER: &str = "42";

/// Base creation time for built notifications, 2023-11-14 in micros.
const BASE_MICROS: i64 = 1_700_000_000_000_000;

/// Build a notification for tests.
///
/// Unset ids are allocated from a process-wide counter, and unset
/// creation times follow the id, so notifications built later are newer.
#[derive(Debug, Default)]
pub struct NotificationBuilder {
    /// Override the id.
    pub id: Option<i64>,
    /// Override the owning user. Defaults to [TEST_USER].
    pub user_id: Option<UserId>,
    /// Override the title.
    pub title: Option<String>,
    /// Override the content.
    pub content: Option<String>,
    /// Override the read flag. Defaults to unread.
    pub is_read: Option<bool>,
    /// Override the creation time.
    pub created_at: Option<Timestamp>,
}

impl NotificationBuilder {
    /// Build the notification.
    pub fn build(self) -> Notification {
        static NXT: AtomicI64 = AtomicI64::new(1);
        let id = self.id.unwrap_or_else(|| NXT.fetch_add(1, Ordering::Relaxed));
        let created_at = self
            .created_at
            .unwrap_or_else(|| Timestamp::from_micros(BASE_MICROS + id * 1_000_000));
        Notification {
            id: NotificationId(id),
            user_id: self.user_id.unwrap_or_else(|| TEST_USER.into()),
            title: self.title.unwrap_or_else(|| format!("title-{id}")),
            content: self.content.unwrap_or_else(|| format!("content-{id}")),
            is_read: self.is_read.unwrap_or(false),
            created_at,
        }
    }
}

/// Build a notification for [TEST_USER] with an explicit id, read flag
/// and creation time (in seconds past the test base time).
pub fn notification(id: i64, is_read: bool, created_at_s: i64) -> Notification {
    NotificationBuilder {
        id: Some(id),
        is_read: Some(is_read),
        created_at: Some(Timestamp::from_micros(
            BASE_MICROS + created_at_s * 1_000_000,
        )),
        ..Default::default()
    }
    .build()
}

/// Extract the ids of a list, in order.
pub fn ids(list: &[Notification]) -> Vec<i64> {
    list.iter().map(|n| n.id.0).collect()
}

/// True if the list is ordered newest first.
pub fn is_newest_first(list: &[Notification]) -> bool {
    list.windows(2).all(|w| w[0].created_at >= w[1].created_at)
}
