use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "ecoaction_client=debug";

/// Install a fmt subscriber honouring `RUST_LOG`, falling back to
/// `default_filter`. Safe to call more than once; later calls are no-ops.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
