use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "sashido_s3_adapter=info";
const VERBOSE_FILTER: &str = "sashido_s3_adapter=debug,info";

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Compact human-readable logs. `level` overrides the crate's default level
/// unless `RUST_LOG` is set.
pub fn init_cli_logger(verbose: bool, level: Option<&str>) {
    let filter = match (verbose, level) {
        (true, _) => env_filter(VERBOSE_FILTER),
        (false, Some(level)) => env_filter(&format!("sashido_s3_adapter={}", level)),
        (false, None) => env_filter(DEFAULT_FILTER),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON logs for log collectors.
pub fn init_json_logger(level: Option<&str>) {
    let filter = match level {
        Some(level) => env_filter(&format!("sashido_s3_adapter={}", level)),
        None => env_filter(DEFAULT_FILTER),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
