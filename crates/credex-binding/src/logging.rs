//! # Default Logger
//!
//! Installs a `tracing-subscriber` fmt subscriber for hosts that do not
//! bring their own.

use tracing_subscriber::EnvFilter;

use credex_core::{CredexError, CredexResult, ErrorKind};

/// Install the default subscriber.
///
/// `pattern` is an `EnvFilter` directive such as `"info"` or
/// `"credex_exchange=debug"`. Without one, `RUST_LOG` is used, falling back
/// to `info`. Calling this again once a subscriber is installed is a no-op.
pub fn init_default_logger(pattern: Option<&str>) -> CredexResult<()> {
    let filter = match pattern {
        Some(p) => EnvFilter::try_new(p).map_err(|e| {
            CredexError::new(
                ErrorKind::InvalidConfiguration,
                format!("invalid log pattern `{p}`: {e}"),
            )
        })?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("subscriber already installed; keeping it");
    }
    Ok(())
}
