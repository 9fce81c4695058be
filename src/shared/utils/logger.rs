use log::{debug, error, info};
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the env_logger backend once per process. `RUST_LOG` overrides
/// the per-module defaults below.
pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info) // Default level
            .filter_module("rollmap_lib", log::LevelFilter::Debug)
            .filter_module("rollmap", log::LevelFilter::Debug)
            .filter_module("diesel", log::LevelFilter::Warn)
            .filter_module("reqwest", log::LevelFilter::Warn)
            .filter_module("hyper", log::LevelFilter::Warn)
            .filter_module("tokio", log::LevelFilter::Warn)
            .filter_module("governor", log::LevelFilter::Warn)
            .parse_default_env()
            .format_timestamp_secs()
            .format_target(false)
            .format_module_path(false)
            .init();

        debug!("logger ready");
    });
}

/// Thin wrappers over `log`, imported by path from every module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

/// Message shapes shared by every stage, so log lines stay greppable.
pub struct LogContext;

impl LogContext {
    /// Bulk SQL step; the timed variant logs at info.
    pub fn db_operation(operation: &str, table: &str, duration_ms: Option<u64>) {
        match duration_ms {
            Some(duration) => info!("DB: {} on {} completed in {}ms", operation, table, duration),
            None => debug!("DB: Starting {} on {}", operation, table),
        }
    }

    /// Outbound geocoding or imagery request.
    pub fn api_call(service: &str, endpoint: &str, status: &str, duration_ms: Option<u64>) {
        match duration_ms {
            Some(duration) => debug!("API: {} {} {} in {}ms", service, endpoint, status, duration),
            None => debug!("API: Starting {} {}", service, endpoint),
        }
    }

    /// Per-worker progress line, e.g. `[ingest#2] 4000/12000 units`
    pub fn worker_progress(stage: &str, worker: usize, current: usize, total: usize, what: &str) {
        info!("[{}#{}] {}/{} {}", stage, worker, current, total, what);
    }

    /// Log the merged counters at the end of a stage
    pub fn stage_summary(stage: &str, summary: &str) {
        info!("Stage '{}' finished: {}", stage, summary);
    }

    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!("{}: {}", context, error);
    }

    /// Wall-clock time of a stage or download.
    pub fn performance_metric(operation: &str, duration_ms: u64, additional_info: Option<&str>) {
        match additional_info {
            Some(info) => info!(
                "{} took {}ms ({})",
                operation, duration_ms, info
            ),
            None => info!("{} took {}ms", operation, duration_ms),
        }
    }
}

/// Logs its operation name on start and the elapsed time on finish.
pub struct TimedOperation {
    start: std::time::Instant,
    operation: String,
}

impl TimedOperation {
    pub fn new(operation: &str) -> Self {
        debug!("{} started", operation);
        Self {
            start: std::time::Instant::now(),
            operation: operation.to_string(),
        }
    }

    pub fn finish(self) -> u64 {
        let duration = self.start.elapsed().as_millis() as u64;
        LogContext::performance_metric(&self.operation, duration, None);
        duration
    }

    pub fn finish_with_info(self, info: &str) -> u64 {
        let duration = self.start.elapsed().as_millis() as u64;
        LogContext::performance_metric(&self.operation, duration, Some(info));
        duration
    }
}
