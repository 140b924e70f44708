//! Logging setup using tracing_subscriber.

use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

static MEDIAQL_LOG_ENV_VAR: &str = "MEDIAQL_LOG";

/// Install a stderr subscriber.
///
/// Directives come from `MEDIAQL_LOG` when set, otherwise from
/// `default_level` (usually `[logging] level` of the settings). Later calls
/// do nothing.
pub fn init(default_level: &str) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let directives =
            std::env::var(MEDIAQL_LOG_ENV_VAR).unwrap_or_else(|_| default_level.to_string());
        let env_filter = env_filter(&directives);

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .init();

        tracing::debug!(directives = %directives, "logging initialised");
    });
}

/// Parse `directives`, falling back to `warn` for anything unparseable.
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}
