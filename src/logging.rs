//! Tracing subscriber bootstrap

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "drivegrade=info";

/// Install a formatted tracing subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already installed; calling it again is
/// harmless.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing();
        assert!(!init_tracing());
    }
}
