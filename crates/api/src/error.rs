//! Notisync error types.

use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The notisync error type. This type is used in all external
/// notisync apis as well as internally between modules.
///
/// This type is required to implement `Clone` so the last fetch error
/// can be held in a session [Snapshot](crate::Snapshot) and handed to
/// every observer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NsError {
    /// A caller passed an argument the operation cannot work with.
    #[error("invalid argument: {ctx}")]
    InvalidArgument {
        /// What was wrong with the argument.
        ctx: Arc<str>,
    },

    /// The operation requires a user, but none is present.
    #[error("no user is available for this operation")]
    MissingUser,

    /// The operation was cancelled before it could complete.
    #[error("operation cancelled")]
    Cancelled,

    /// Loading the notification list failed after exhausting retries.
    #[error("fetch failed: {ctx} (src: {src})")]
    Fetch {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The last attempt's error.
        #[source]
        src: DynInnerError,
    },

    /// A read-flag mutation was rejected or could not reach the backend.
    #[error("mutation failed: {ctx} (src: {src})")]
    Mutation {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// Generic notisync internal error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },
}

fn ctx_str<C: std::fmt::Display>(ctx: C) -> Arc<str> {
    ctx.to_string().into_boxed_str().into()
}

impl NsError {
    /// Construct an "invalid argument" error.
    pub fn invalid_argument<C: std::fmt::Display>(ctx: C) -> Self {
        Self::InvalidArgument { ctx: ctx_str(ctx) }
    }

    /// Construct a "fetch" error wrapping the last attempt's error.
    pub fn fetch<C: std::fmt::Display>(ctx: C, src: NsError) -> Self {
        Self::Fetch {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a "mutation" error wrapping the backend error.
    pub fn mutation<C: std::fmt::Display>(ctx: C, src: NsError) -> Self {
        Self::Mutation {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Other {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Other {
            ctx: ctx_str(ctx),
            src: DynInnerError::default(),
        }
    }
}

/// The notisync result type.
pub type NsResult<T> = Result<T, NsError>;
