//! # mapeo-alert-kml
//!
//! Turn free-text field reports into geolocated alert records and export them
//! as a KML document for Google Earth, QGIS and other mapping tools.
//!
//! ## Why this crate?
//!
//! Monitoring teams send alerts as chat messages: a title, a category, a
//! timestamp in whatever format the phone produced, a UTM position, and a few
//! lines of notes, sometimes with a photo. Mapping tools want
//! placemarks with latitude/longitude. This crate bridges the two with
//! best-effort pattern matching and a proper UTM inverse projection.
//!
//! ## Pipeline Overview
//!
//! ```text
//! message text (+ optional photo)
//!  │
//!  ├─ 1. Normalise  line endings, signatures, whitespace
//!  ├─ 2. Extract    coordinates · timestamp · category · metadata · title
//!  ├─ 3. Convert    UTM zone/easting/northing → WGS84 lat/lng
//!  ├─ 4. Encode     photo → base64 data URI (async, bounded by a timeout)
//!  ├─ 5. Collect    append to the session's RecordCollection
//!  └─ 6. Export     compact KML + suggested file name
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapeo_alert_kml::{export, submit, ExtractionConfig, ImageSource, RecordCollection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let mut session = RecordCollection::new();
//!
//!     let message = "Flood report — Flooding\n\
//!                    March 5, 2024, 10:15 AM\n\
//!                    UTM 18N 500000 4649776\n\
//!                    Water rising near the school";
//!     submit(&mut session, message, Some(ImageSource::path("photo.jpg")), &config).await?;
//!
//!     let kml = export(&session, &config)?;
//!     std::fs::write(&kml.filename, &kml.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `alert2kml` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! mapeo-alert-kml = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod session;
pub mod submit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CategoryStrategy, ExtractionConfig, ExtractionConfigBuilder, Layout, MetadataStrategy,
    NormalizeMode,
};
pub use error::AlertError;
pub use pipeline::encode::ImageSource;
pub use pipeline::kml::{KmlExport, KML_CONTENT_TYPE};
pub use record::{AlertRecord, EncodedImage, ExtractedFields, GeoPoint, RawCoordinateMatch};
pub use session::RecordCollection;
pub use submit::{export, export_to_file, extract_fields, materialize, submit, submit_sync};
