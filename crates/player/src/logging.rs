use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Install `env_logger` at `Info` unless a logger is already set.
/// `RUST_LOG` still overrides the level.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder()
            .is_test(false)
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .try_init();
    });
}
