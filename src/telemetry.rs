use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level`. Logs go to stderr so command output
/// on stdout stays clean.
pub fn init_tracing(default_level: &str, verbose: bool) {
    let fallback = if verbose { "debug" } else { default_level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (tests) is not an error worth surfacing.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Span wrapping one CLI request, tagged with a fresh request id.
pub fn request_span(command: &str) -> tracing::Span {
    tracing::info_span!("request", command, request.id = %Uuid::new_v4())
}
