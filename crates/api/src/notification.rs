//! Notification records and the live events that carry them.

use crate::*;

/// The maximum number of notifications a session holds in memory.
/// It is also the default list limit requested from the backend.
pub const MAX_LIST_LEN: usize = 20;

/// A single notification as stored by the backend.
#[derive(
    Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct Notification {
    /// Unique id within the owning user's list.
    pub id: NotificationId,

    /// The owning user.
    pub user_id: UserId,

    /// Display title.
    pub title: String,

    /// Display body.
    pub content: String,

    /// Whether the user has read this notification. Only ever goes
    /// from `false` to `true`.
    pub is_read: bool,

    /// Creation time. Lists are ordered newest first by this field.
    pub created_at: Timestamp,
}

/// The kind of change a [LiveEvent] describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LiveEventKind {
    /// A new notification was created.
    Insert,

    /// An existing notification changed, e.g. another session read it.
    Update,
}

/// A change pushed to us over a live channel.
#[derive(
    Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct LiveEvent {
    /// What happened.
    pub kind: LiveEventKind,

    /// The full record after the change.
    pub record: Notification,
}

impl LiveEvent {
    /// Construct an insert event.
    pub fn insert(record: Notification) -> Self {
        Self {
            kind: LiveEventKind::Insert,
            record,
        }
    }

    /// Construct an update event.
    pub fn update(record: Notification) -> Self {
        Self {
            kind: LiveEventKind::Update,
            record,
        }
    }

    /// Encode this event for transmission over a live channel.
    pub fn encode(&self) -> NsResult<bytes::Bytes> {
        serde_json::to_vec(self)
            .map(bytes::Bytes::from)
            .map_err(|e| NsError::other_src("encode live event", e))
    }

    /// Decode and validate a raw payload received on the channel of
    /// `user`. Records that belong to a different user are rejected.
    pub fn decode(user: &UserId, data: &[u8]) -> NsResult<Self> {
        let event: Self = serde_json::from_slice(data)
            .map_err(|e| NsError::other_src("decode live event", e))?;
        if &event.record.user_id != user {
            return Err(NsError::other(format!(
                "live event for user {} on channel of user {user}",
                event.record.user_id,
            )));
        }
        Ok(event)
    }
}
