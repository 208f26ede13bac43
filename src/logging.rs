use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` or `default_directive` when unset.
///
/// Console output for the user goes to stdout, so the two never interleave
/// in a pipe.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
