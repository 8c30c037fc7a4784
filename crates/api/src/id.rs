//! Identity types used by notisync.

use crate::*;
use std::sync::Arc;

macro_rules! imp_deref {
    ($i:ty, $t:ty) => {
        impl std::ops::Deref for $i {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

macro_rules! imp_from {
    ($a:ty, $b:ty, $i:ident => $e:expr) => {
        impl From<$b> for $a {
            fn from($i: $b) -> Self {
                $e
            }
        }
    };
}

/// Identifies the user that owns a notification list.
///
/// Backends key users by either a string or an integer, so this is held
/// as a string and can be built from either. Use [UserId::parse] when the
/// value comes from outside and might be empty.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(from = "UserIdRepr", into = "String")]
pub struct UserId(pub Arc<str>);

imp_deref!(UserId, str);
imp_from!(UserId, &str, s => UserId(s.into()));
imp_from!(UserId, String, s => UserId(s.into_boxed_str().into()));
imp_from!(UserId, i64, n => UserId(n.to_string().into_boxed_str().into()));
imp_from!(UserId, u64, n => UserId(n.to_string().into_boxed_str().into()));
imp_from!(String, UserId, u => u.0.to_string());

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl UserId {
    /// Parse a user id, rejecting empty or whitespace-only input.
    pub fn parse(s: &str) -> NsResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NsError::invalid_argument("empty user id"));
        }
        Ok(s.into())
    }
}

/// Wire form of a user id: a json string or number.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum UserIdRepr {
    Str(String),
    Num(i64),
}

impl From<UserIdRepr> for UserId {
    fn from(r: UserIdRepr) -> Self {
        match r {
            UserIdRepr::Str(s) => s.into(),
            UserIdRepr::Num(n) => n.into(),
        }
    }
}

/// Identifies a single notification. Unique within one user's list.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

imp_deref!(NotificationId, i64);
imp_from!(NotificationId, i64, n => NotificationId(n));

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
