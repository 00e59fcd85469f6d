//! `tracing` setup for the binary.
//!
//! Events go to stderr so stdout stays the interactive console. The filter
//! comes from `RUST_LOG`, then `WEBBRIEF_LOG`, then [`DEFAULT_FILTER`].

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Filter directive to use, given the two candidate variables.
pub fn filter_directive(rust_log: Option<String>, webbrief_log: Option<String>) -> String {
    non_empty(rust_log)
        .or_else(|| non_empty(webbrief_log))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init() {
    let directive = filter_directive(
        std::env::var("RUST_LOG").ok(),
        std::env::var("WEBBRIEF_LOG").ok(),
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("webbrief: ignoring invalid log filter {directive:?}: {e}");
        EnvFilter::new(DEFAULT_FILTER)
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins_over_webbrief_log() {
        assert_eq!(
            filter_directive(Some("debug".into()), Some("info".into())),
            "debug"
        );
        assert_eq!(filter_directive(None, Some("info".into())), "info");
        assert_eq!(filter_directive(Some("  ".into()), Some("info".into())), "info");
        assert_eq!(filter_directive(None, None), DEFAULT_FILTER);
    }
}
