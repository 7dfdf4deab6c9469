//! Test logging

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter for test runs
pub const LOG_ENV: &str = "TF_LOG";

/// Install a fmt subscriber writing through the test harness. Safe to call
/// from every test; only the first call installs anything.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .try_init();
}
