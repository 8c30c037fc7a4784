#![deny(missing_docs)]
//! Notisync API contains the notification sync module traits and the basic
//! types required to define the api of those traits.
//!
//! If you want a working client, please see the notisync_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod backend;
pub use backend::*;

pub mod builder;
pub use builder::*;

pub mod cache;
pub use cache::*;

pub mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod id;
pub use id::{NotificationId, UserId};

pub mod live;
pub use live::*;

pub mod notification;
pub use notification::*;

pub mod session;
pub use session::*;

mod timestamp;
pub use timestamp::*;
