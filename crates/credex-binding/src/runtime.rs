//! Blocking-pool dispatch for exchange calls.

use credex_core::{CredexError, CredexResult, ErrorKind};

/// Run `f` on tokio's blocking pool and flatten the join error into
/// `UnknownError`.
pub(crate) async fn run_blocking<F, R>(f: F) -> CredexResult<R>
where
    F: FnOnce() -> CredexResult<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "blocking exchange call did not complete");
        CredexError::new(ErrorKind::UnknownError, format!("blocking task failed: {e}"))
    })?
}
