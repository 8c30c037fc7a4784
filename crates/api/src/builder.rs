//! Builder-related types.

use crate::*;
use std::sync::Arc;

/// The general notisync builder.
/// This contains both configuration and factory instances,
/// allowing construction of runtime module instances.
#[derive(Debug)]
pub struct Builder {
    /// The module configuration to be used when building modules.
    /// This can be loaded from disk or modified before freezing the builder.
    pub config: Config,

    /// The [BackendFactory] to be used for creating [Backend] instances.
    pub backend: DynBackendFactory,

    /// The [LiveFactory] to be used for creating [Live] instances.
    pub live: DynLiveFactory,

    /// The [CacheFactory] to be used for creating [Cache] instances.
    pub cache: DynCacheFactory,

    /// The [SessionFactory] to be used for mounting [Session] instances.
    pub session: DynSessionFactory,
}

impl Builder {
    /// Construct a default config given the configured module factories.
    ///
    /// Note, this should be called before freezing the Builder instance
    /// in an Arc<>.
    pub fn with_default_config(mut self) -> NsResult<Self> {
        {
            let Self {
                config,
                backend,
                live,
                cache,
                session,
            } = &mut self;

            backend.default_config(config)?;
            live.default_config(config)?;
            cache.default_config(config)?;
            session.default_config(config)?;
        }

        Ok(self)
    }

    /// Run every module factory's config validation.
    pub fn validate_config(&self) -> NsResult<()> {
        self.backend.validate_config(&self.config)?;
        self.live.validate_config(&self.config)?;
        self.cache.validate_config(&self.config)?;
        self.session.validate_config(&self.config)?;

        Ok(())
    }

    /// Validate the config and freeze this builder so module instances
    /// can be created from it.
    pub fn build(self) -> NsResult<Arc<Self>> {
        self.validate_config()?;
        Ok(Arc::new(self))
    }
}
