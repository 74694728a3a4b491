//! Tracing setup shared by the CLI and the server.
//!
//! Reads `RUST_LOG`; falls back to the given directive (e.g. `wedding_site=info`).
//! Output goes to stderr so CLI stdout stays clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
