//! Pipeline stages for field-report extraction.
//!
//! Each submodule implements exactly one transformation step and is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ extract ──▶ utm ──▶ (encode) ──▶ kml
//! (whitespace)  (regexes)   (proj)  (base64)     (writer)
//! ```
//!
//! 1. [`normalize`] — unify line endings, strip signatures, collapse
//!    whitespace, optionally flatten to one line
//! 2. [`extract`]   — pull coordinates, timestamp, category, metadata and
//!    title out of the normalised text
//! 3. [`utm`]       — convert the zone/easting/northing triple to WGS84
//! 4. [`encode`]    — read and base64-wrap an attached photo; the only
//!    stage that awaits
//! 5. [`kml`]       — write the accumulated records as a compact KML document

pub mod encode;
pub mod extract;
pub mod kml;
pub mod normalize;
pub mod utm;
