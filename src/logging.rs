/*!
 * Tracing setup
 * Subscriber for the events the allocator emits
 */

use tracing::info;
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

/// Installs a `fmt` subscriber as the global default.
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - FLALLOC_TRACE_JSON: Enable JSON output (default: false)
///
/// Fails if a global subscriber is already set. Do not combine with an
/// allocator that has events enabled and serves this subscriber's own
/// allocations.
pub fn init_tracing() -> Result<(), TryInitError> {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let use_json = std::env::var("FLALLOC_TRACE_JSON")
    .map(|v| v == "1" || v == "true")
    .unwrap_or(false);

  let registry = tracing_subscriber::registry().with(env_filter);

  if use_json {
    registry
      .with(
        tracing_subscriber::fmt::layer()
          .json()
          .with_target(true)
          .with_line_number(true)
          .with_file(true),
      )
      .try_init()?;
    info!("tracing initialized with JSON output");
  } else {
    registry
      .with(
        tracing_subscriber::fmt::layer()
          .with_target(true)
          .with_line_number(true)
          .compact(),
      )
      .try_init()?;
    info!("tracing initialized");
  }

  Ok(())
}
