//! Logging initialisation.
//!
//! The library crates only emit `tracing` events; hosts decide where they
//! go. [`init`] installs a formatting subscriber for hosts that have none.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter` (e.g. `"entable=debug"`).
/// Returns false when a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
