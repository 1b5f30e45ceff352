use tracing_subscriber::EnvFilter;

/// install a global fmt subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_level` is used. Calling this
/// more than once is harmless, later calls are ignored.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}
