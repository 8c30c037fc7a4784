//! Test utilities for notisync.

#![deny(missing_docs)]

pub mod backend_srv;
pub mod notification;

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Repeatedly run a check body until it `break`s, sleeping between
/// attempts. Panics if the body has not broken out after the timeout.
///
/// - `iter_check!({ .. })` checks every 10ms for up to 5s.
/// - `iter_check!(timeout_ms, { .. })` uses a custom timeout.
/// - `iter_check!(timeout_ms, interval_ms, { .. })` uses both.
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:expr, $interval_ms:expr, $code:block) => {
        ::tokio::time::timeout(
            ::std::time::Duration::from_millis($timeout_ms),
            async {
                loop {
                    $code
                    ::tokio::time::sleep(::std::time::Duration::from_millis(
                        $interval_ms,
                    ))
                    .await;
                }
            },
        )
        .await
        .expect("iter_check timed out");
    };
    ($timeout_ms:expr, $code:block) => {
        $crate::iter_check!($timeout_ms, 10, $code)
    };
    ($code:block) => {
        $crate::iter_check!(5000, 10, $code)
    };
}
