pub mod api;
pub mod auth;
pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod session;
pub mod settings;
pub mod storage;
pub mod summary;
pub mod upload;

pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Installs the `tracing` subscriber on stderr, honoring `RUST_LOG` and
/// falling back to `default_level`. Stdout stays free for command output.
pub fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn filter_falls_back_to_default_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert_eq!(env_filter("warn").max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(env_filter("info").max_level_hint(), Some(LevelFilter::INFO));
    }
}
