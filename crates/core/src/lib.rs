#![deny(missing_docs)]
//! Notisync notification sync client core.
//!
//! This crate provides the module implementations behind the
//! [notisync_api] traits, and the [NotificationClient] that wires them
//! together.

use notisync_api::*;

/// Construct a production-ready default builder.
///
/// - `backend` - The default backend is [factories::CoreBackendFactory].
/// - `live` - The default live channel is [factories::NoopLiveFactory].
///            Note: plug in a realtime service adapter to get live updates.
/// - `cache` - The default cache is [factories::MemCacheFactory].
/// - `session` - The default session is [factories::CoreSessionFactory].
pub fn default_builder() -> Builder {
    Builder {
        config: Config::default(),
        backend: factories::CoreBackendFactory::create(),
        live: factories::NoopLiveFactory::create(),
        cache: factories::MemCacheFactory::create(),
        session: factories::CoreSessionFactory::create(),
    }
}

/// Construct a builder suitable for testing. The backend and live
/// channel are in-process, see [factories::MemBackendFactory].
pub fn default_test_builder() -> Builder {
    Builder {
        config: Config::default(),
        backend: factories::MemBackendFactory::create(),
        live: factories::MemLiveFactory::create(),
        cache: factories::MemCacheFactory::create(),
        session: factories::CoreSessionFactory::create(),
    }
}

mod client;
pub use client::*;

pub mod factories;

pub mod fetcher;
