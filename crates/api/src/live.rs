//! Live update channel related types.

use crate::*;
use std::sync::Arc;

/// The receiving end of a live channel scoped to a single user.
///
/// Payloads are handed over undecoded, see [LiveEvent::decode].
/// Dropping the subscription tears the channel down.
#[derive(Debug)]
pub struct LiveSubscription {
    user: UserId,
    recv: tokio::sync::mpsc::Receiver<bytes::Bytes>,
}

impl LiveSubscription {
    /// Wrap the receiving half of a channel opened for `user`.
    pub fn new(
        user: UserId,
        recv: tokio::sync::mpsc::Receiver<bytes::Bytes>,
    ) -> Self {
        Self { user, recv }
    }

    /// The user this channel is scoped to.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Receive the next raw payload. `None` once the channel has closed.
    pub async fn recv(&mut self) -> Option<bytes::Bytes> {
        self.recv.recv().await
    }

    /// Receive the next payload and decode it, skipping (and logging)
    /// payloads that fail validation. `None` once the channel has closed.
    pub async fn recv_event(&mut self) -> Option<LiveEvent> {
        loop {
            let data = self.recv.recv().await?;
            match LiveEvent::decode(&self.user, &data) {
                Ok(event) => return Some(event),
                Err(err) => {
                    tracing::debug!(?err, user = %self.user, "dropping invalid live event");
                }
            }
        }
    }
}

/// A push channel delivering insert and update events per user.
pub trait Live: 'static + Send + Sync + std::fmt::Debug {
    /// Open a channel for `user`.
    fn subscribe(&self, user: UserId) -> BoxFut<'_, NsResult<LiveSubscription>>;
}

/// Trait-object [Live].
pub type DynLive = Arc<dyn Live>;

/// A factory for constructing [Live] instances.
pub trait LiveFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> NsResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &Config) -> NsResult<()>;

    /// Construct a live channel instance.
    fn create(&self, builder: Arc<Builder>)
        -> BoxFut<'static, NsResult<DynLive>>;
}

/// Trait-object [LiveFactory].
pub type DynLiveFactory = Arc<dyn LiveFactory>;
