//! Factories for generating instances of notisync modules.

pub mod core_backend;
pub use core_backend::CoreBackendFactory;

pub mod core_session;
pub use core_session::CoreSessionFactory;

pub mod mem_backend;
pub use mem_backend::{
    MemBackend, MemBackendConfig, MemBackendFactory, MemBackendModConfig,
    MemLiveFactory,
};

mod mem_cache;
pub use mem_cache::*;

mod noop_live;
pub use noop_live::*;
