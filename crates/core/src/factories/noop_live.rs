//! A live channel that never delivers anything.

use notisync_api::*;
use std::sync::{Arc, Mutex};

/// The noop live channel factory. Sessions built with it load their
/// list and accept mutations, but only see changes made elsewhere after
/// a [Session::retry] or a new mount.
#[derive(Debug)]
pub struct NoopLiveFactory {}

impl NoopLiveFactory {
    /// Construct a new NoopLiveFactory.
    pub fn create() -> DynLiveFactory {
        let out: DynLiveFactory = Arc::new(Self {});
        out
    }
}

impl LiveFactory for NoopLiveFactory {
    fn default_config(&self, _config: &mut Config) -> NsResult<()> {
        Ok(())
    }

    fn validate_config(&self, _config: &Config) -> NsResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<Builder>,
    ) -> BoxFut<'static, NsResult<DynLive>> {
        Box::pin(async move {
            let out: DynLive = Arc::new(NoopLive::default());
            Ok(out)
        })
    }
}

/// Hands out channels that stay open but silent.
#[derive(Debug, Default)]
struct NoopLive {
    // senders are held so the receivers do not observe a close
    open: Mutex<Vec<tokio::sync::mpsc::Sender<bytes::Bytes>>>,
}

impl Live for NoopLive {
    fn subscribe(
        &self,
        user: UserId,
    ) -> BoxFut<'_, NsResult<LiveSubscription>> {
        Box::pin(async move {
            let (send, recv) = tokio::sync::mpsc::channel(1);
            let mut lock = self.open.lock().unwrap();
            lock.retain(|s| !s.is_closed());
            lock.push(send);
            Ok(LiveSubscription::new(user, recv))
        })
    }
}
