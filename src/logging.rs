use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global fmt subscriber once, writing to stderr. `RUST_LOG` wins over
/// `default_filter`. Later calls are no-ops, so tests may call this freely.
pub fn init(default_filter: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        // another subscriber may already be installed by the host; keep it
        let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    });
}
