use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CLI_DIRECTIVES: &str = "shortbox=info,warn";
const CLI_VERBOSE_DIRECTIVES: &str = "shortbox=debug,info";
const SERVICE_DIRECTIVES: &str = "shortbox=info,shortener=info,axum=info,tower_http=info,hyper=warn";

/// `RUST_LOG` wins over the built-in directives.
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Human-readable output for the build/launch CLI.
pub fn init_cli_logger(verbose: bool) {
    let directives = if verbose {
        CLI_VERBOSE_DIRECTIVES
    } else {
        CLI_DIRECTIVES
    };

    tracing_subscriber::registry()
        .with(env_filter(directives))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .compact(),
        )
        .init();
}

/// One JSON object per line for the long-running shortener service.
pub fn init_service_logger() {
    tracing_subscriber::registry()
        .with(env_filter(SERVICE_DIRECTIVES))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();
}
