//! Tracing initialization.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Selects JSON log lines instead of the compact format when set to `json`.
pub const LOG_FORMAT_VAR: &str = "JAVADOC_SEARCH_LOG_FORMAT";

fn running_under_test() -> bool {
    std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok()
}

fn base_filter(is_test: bool) -> EnvFilter {
    let level = if is_test {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    EnvFilter::from_default_env().add_directive(level.into())
}

/// Initialize tracing. Safe to call multiple times.
///
/// `RUST_LOG` refines the filter on top of `info` (`debug` under a test
/// runner, where output goes to the captured test writer). Logs go to stderr
/// so that command output on stdout stays clean.
pub fn init() {
    INIT.call_once(|| {
        let is_test = running_under_test();
        let json = std::env::var(LOG_FORMAT_VAR).is_ok_and(|format| format == "json");
        let builder = tracing_subscriber::fmt()
            .with_env_filter(base_filter(is_test))
            .with_ansi(false)
            .with_target(true)
            .with_span_events(FmtSpan::NONE);

        let result = if is_test {
            // keep the guard for the whole process, dropping it resets the default
            std::mem::forget(builder.compact().with_test_writer().finish().set_default());
            Ok(())
        } else if json {
            builder.json().with_writer(std::io::stderr).try_init()
        } else {
            builder.compact().with_writer(std::io::stderr).try_init()
        };
        if let Err(e) = result {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}
