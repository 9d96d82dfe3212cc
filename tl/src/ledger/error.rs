//! Ledger persistence errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors from saving or loading a ledger snapshot
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = LedgerError::io(
            "/tmp/out/ledger.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out/ledger.json"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_version_error() {
        let err = LedgerError::UnsupportedVersion { found: 9, expected: 1 };
        assert_eq!(err.to_string(), "Unsupported snapshot version 9 (expected 1)");
    }
}
