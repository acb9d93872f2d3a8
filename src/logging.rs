//! Log setup. The terminal belongs to the table view, so log lines only go
//! to a file and only when one is given.
//!
//! Filtering follows `RUST_LOG` when set, e.g. `RUST_LOG=tsvt::view=trace`,
//! and falls back to the `--log-level` option otherwise.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::TVError;

pub fn init(log_file: Option<&Path>, default_level: &str) -> Result<(), TVError> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level));
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| TVError::IoError(io::Error::other(e)))
}
