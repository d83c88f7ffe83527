//! Logging for utilp
//!
//! Diagnostics go through `tracing`; [`PrintLogger`] is the user-facing
//! console and file logger built on top of it.

mod print_logger;

pub use print_logger::{LoggerConfig, PrintLogger, run_timestamp};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level follows `verbosity`:
/// warn, info, debug, then trace for 3 and above. Events go to stderr so
/// they never mix with command output. Calling this twice is a no-op.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
