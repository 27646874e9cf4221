// ABOUTME: Shared logging setup for pqc-migrate binaries
// ABOUTME: init() for stderr, init_with_default() when the caller picks the base level

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
///
/// The fmt layer prefixes every line with its level, which is the
/// severity tag operators read on the console.
pub fn init() {
    init_with_default(Level::INFO);
}

/// Logging to stderr with a caller-chosen base level. RUST_LOG still wins.
pub fn init_with_default(level: Level) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .init();
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}

#[cfg(test)]
mod tests {
    #[test]
    fn exports_init() {
        let _ = super::init as fn();
    }

    #[test]
    fn exports_init_with_default() {
        let _ = super::init_with_default as fn(tracing::Level);
    }

    #[test]
    fn filter_carries_requested_level() {
        let filter = super::build_filter(tracing::Level::DEBUG);
        assert!(filter.to_string().contains("debug"));
    }
}
