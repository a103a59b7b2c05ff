//! Diagnostic logging.
//!
//! Library code only emits `tracing` events; the binary decides whether and
//! where they go. Output is written to stderr so that streamed completions on
//! stdout stay clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUIET_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "routechat=debug,warn";
const TRACE_FILTER: &str = "routechat=trace,info";

/// Directive used when `RUST_LOG` is unset, by `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => QUIET_FILTER,
        1 => VERBOSE_FILTER,
        _ => TRACE_FILTER,
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the verbosity flag.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity > 1),
        )
        .try_init();
}
