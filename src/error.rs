//! Error types for the mapeo-alert-kml library.
//!
//! Extraction distinguishes two failure modes:
//!
//! * **Hard failures** return [`AlertError`] and stop the pipeline before any
//!   record is created or appended (no coordinates, an invalid UTM zone, an
//!   image that could not be encoded).
//!
//! * **Soft fallbacks** are not errors at all: a missing title, category or
//!   timestamp is replaced by its `Unknown …` placeholder and the pipeline
//!   carries on. See [`crate::record`] for the placeholder constants.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mapeo-alert-kml library.
#[derive(Debug, Error)]
pub enum AlertError {
    // ── Extraction errors ─────────────────────────────────────────────────
    /// No `UTM <zone> <easting> <northing>` pattern anywhere in the message.
    #[error("UTM coordinates not found in the input text.\nExpected something like 'UTM 18N 500000 4649776'.")]
    CoordinatesNotFound,

    /// The zone label could not be turned into a UTM zone.
    #[error("Invalid UTM zone '{label}': {reason}")]
    InvalidZone { label: String, reason: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The image file could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image source contained no bytes.
    #[error("Image is empty; attach a non-empty file or omit the image")]
    ImageEmpty,

    /// Image encoding did not finish within the configured timeout.
    #[error("Image encoding timed out after {secs}s\nIncrease --image-timeout.")]
    ImageTimeout { secs: u64 },

    /// The blocking encode task panicked or was cancelled.
    #[error("Image encoding task failed: {0}")]
    ImageTaskFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// The KML writer rejected an event.
    #[error("Failed to serialise KML: {0}")]
    Serialize(String),

    /// Could not create or write the output KML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AlertError {
    /// `true` for failures caused by the message text itself rather than
    /// by the image, the filesystem or the configuration.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            AlertError::CoordinatesNotFound | AlertError::InvalidZone { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_not_found_display() {
        let msg = AlertError::CoordinatesNotFound.to_string();
        assert!(msg.contains("UTM coordinates not found"), "got: {msg}");
    }

    #[test]
    fn test_invalid_zone_display() {
        let e = AlertError::InvalidZone {
            label: "61N".into(),
            reason: "zone number must be 1–60".into(),
        };
        assert!(e.to_string().contains("61N"));
        assert!(e.to_string().contains("1–60"));
    }

    #[test]
    fn test_image_timeout_display() {
        let e = AlertError::ImageTimeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn test_extraction_failure_classification() {
        assert!(AlertError::CoordinatesNotFound.is_extraction_failure());
        assert!(!AlertError::ImageEmpty.is_extraction_failure());
    }
}
