//! Log output for applications built on the client.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Installs a `fmt` subscriber on stderr.
///
/// `verbose` forces `debug` for everything. Otherwise `RUST_LOG` is
/// honored with `info` as the floor. Calling it twice is harmless: the
/// second call leaves the first subscriber in place.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .try_init();

    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
