use tracing_subscriber::{EnvFilter, fmt};

/// Install the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. With `json` set, events are written
/// as flattened JSON objects for log shippers; otherwise as human-readable lines. Output goes
/// to stderr so stdout stays free for the run summary.
///
/// Calling this twice is harmless: the second subscriber is silently dropped.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.with_target(false).try_init()
    };
}
