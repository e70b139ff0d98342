//! Error types.

use std::path::PathBuf;

/// Failure reading or writing the host configuration store.
///
/// This is the only error a tracking call can return: delivery problems are
/// reported through [`crate::reporter::Delivery`] instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access config store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config store at {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config store lock poisoned")]
    Poisoned,
}
