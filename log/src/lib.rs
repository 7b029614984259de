use std::sync::Mutex;

use slog::Drain;
use slog::Fuse;
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Logger};

/// Creates the process-wide JSON logger, stamped with build metadata
/// from the `info` crate.
pub fn initialize_logger() -> slog::Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!("version" => info::VERSION, "revision" => info::REVISION, "build_timestamp" => info::BUILD_TIMESTAMP),
    )
}

/// Creates a logger that discards every record, for tests that need a
/// `Logger` but no output.
pub fn discard_logger() -> slog::Logger {
    Logger::root(slog::Discard, o!())
}

#[cfg(feature = "env_logging")]
pub fn initialize_env_logger() -> (slog::Logger, slog_scope::GlobalLoggerGuard) {
    let drain = slog_envlogger::new(Mutex::new(Json::default(std::io::stderr())).map(Fuse)).fuse();
    let drain = Async::new(drain).build().fuse();

    let logger = Logger::root(drain, o!("version" => info::VERSION));
    let guard = slog_scope::set_global_logger(logger.clone());

    (logger, guard)
}
