//! Data types flowing through the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Placeholder title when the first line carries none.
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// Placeholder category when no strategy yields one.
pub const UNKNOWN_CATEGORY: &str = "Unknown Category";
/// Placeholder timestamp when no date pattern matches.
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// A `UTM <zone> <easting> <northing>` occurrence found in a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinateMatch {
    /// Zone number plus band letter, e.g. `"18N"`.
    pub zone_label: String,
    pub easting: f64,
    pub northing: f64,
    /// Byte offset just past the northing digits in the searched text.
    pub end: usize,
}

/// WGS84 geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A base64-encoded image ready to be inlined as a data URI.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Standard-alphabet base64 payload, without the `data:` prefix.
    pub data: String,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("data", &format_args!("<{} bytes base64>", self.data.len()))
            .finish()
    }
}

/// Output of the synchronous extraction stage.
///
/// Everything a record needs except the image, which is encoded separately
/// by [`crate::submit::materialize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub title: String,
    pub category: String,
    /// Verbatim matched substring, or [`UNKNOWN_DATE`].
    pub timestamp: String,
    pub coordinate: RawCoordinateMatch,
    pub location: GeoPoint,
    pub metadata: Vec<String>,
}

/// One alert, ready for serialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub title: String,
    pub category: String,
    /// Verbatim timestamp text; never reformatted.
    pub timestamp: String,
    /// `MM.DD.YYYY` derived from `timestamp`, or `"undated"`.
    pub filename_date: String,
    pub location: GeoPoint,
    pub metadata: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EncodedImage>,
}

impl AlertRecord {
    /// Placemark name: `"<title> — <category>"`.
    pub fn display_name(&self) -> String {
        format!("{} — {}", self.title, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_format() {
        let img = EncodedImage {
            mime_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
        };
        assert_eq!(img.data_uri(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_debug_hides_payload() {
        let img = EncodedImage {
            mime_type: "image/jpeg".into(),
            data: "A".repeat(5000),
        };
        let dbg = format!("{img:?}");
        assert!(dbg.contains("5000 bytes"));
        assert!(dbg.len() < 200);
    }
}
