//! Tracing bootstrap.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::AppConfig;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn log_path() -> PathBuf {
    env::var("AGC_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("agc.log"))
}

/// Install the file subscriber once. Stdout stays untouched; it belongs to
/// the status line.
pub fn init(config: &AppConfig) {
    if !config.logs {
        return;
    }
    let _ = TRACING_INIT.get_or_init(|| {
        let file = match OpenOptions::new().create(true).append(true).open(log_path()) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .with_writer(std::sync::Arc::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
