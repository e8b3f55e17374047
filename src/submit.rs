//! Record assembly and export entry points.
//!
//! Turning a message into a record happens in two stages:
//!
//! 1. [`extract_fields`] — synchronous. Normalises the text, runs every
//!    extractor and converts the coordinates. Fails only when the message
//!    has no usable coordinates.
//! 2. [`materialize`] — asynchronous. Awaits the optional image encode and
//!    produces the final [`AlertRecord`].
//!
//! [`submit`] runs both and appends to a [`RecordCollection`]. Because it
//! holds `&mut RecordCollection` across the await, a second submission
//! cannot interleave its append with the first.

use crate::config::ExtractionConfig;
use crate::error::AlertError;
use crate::pipeline::encode::{encode_image, ImageSource};
use crate::pipeline::extract::{
    extract_category, extract_coordinate, extract_metadata, extract_timestamp, extract_title,
    format_filename_date,
};
use crate::pipeline::kml::{self, sanitize_filename_part, KmlExport, KML_CONTENT_TYPE};
use crate::pipeline::{normalize, utm};
use crate::record::{AlertRecord, ExtractedFields};
use crate::session::RecordCollection;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stage one: extract every field from a raw message.
///
/// # Errors
/// - [`AlertError::CoordinatesNotFound`] when no `UTM …` triple is present
/// - [`AlertError::InvalidZone`] when the zone number is outside 1–60
pub fn extract_fields(raw: &str, config: &ExtractionConfig) -> Result<ExtractedFields, AlertError> {
    let text = normalize::normalize(raw, config.normalize);
    debug!("Normalised message: {} → {} bytes", raw.len(), text.len());

    let coordinate = extract_coordinate(&text).ok_or_else(|| {
        warn!("Message has no UTM coordinates; no record created");
        AlertError::CoordinatesNotFound
    })?;
    let location = utm::to_geographic(&coordinate.zone_label, coordinate.easting, coordinate.northing)?;
    debug!(
        "UTM ({}) {} {} → lat {}, lng {}",
        coordinate.zone_label, coordinate.easting, coordinate.northing, location.latitude, location.longitude
    );

    let timestamp = extract_timestamp(&text);
    let category = extract_category(&text, &timestamp, config.category);
    let metadata = extract_metadata(&text, &coordinate, config.metadata);
    let title = extract_title(&text);

    Ok(ExtractedFields {
        title,
        category,
        timestamp,
        coordinate,
        location,
        metadata,
    })
}

/// Stage two: attach the optional image and build the record.
///
/// # Errors
/// Any image failure ([`AlertError::ImageRead`], [`AlertError::ImageEmpty`],
/// [`AlertError::ImageTimeout`], [`AlertError::ImageTaskFailed`]). The
/// record is not produced in that case.
pub async fn materialize(
    fields: ExtractedFields,
    image: Option<ImageSource>,
    config: &ExtractionConfig,
) -> Result<AlertRecord, AlertError> {
    let image = match image {
        Some(source) => {
            let timeout = Duration::from_secs(config.image_timeout_secs);
            Some(encode_image(source, timeout).await?)
        }
        None => None,
    };

    let filename_date = format_filename_date(&fields.timestamp);

    Ok(AlertRecord {
        title: fields.title,
        category: fields.category,
        timestamp: fields.timestamp,
        filename_date,
        location: fields.location,
        metadata: fields.metadata,
        image,
    })
}

/// Extract, materialise and append one message.
///
/// Nothing is appended if either stage fails.
///
/// # Example
/// ```rust,no_run
/// use mapeo_alert_kml::{submit, ExtractionConfig, RecordCollection};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let mut session = RecordCollection::new();
/// let text = "Flood report — Flooding\nMarch 5, 2024, 10:15 AM\nUTM 18N 500000 4649776";
/// let record = submit(&mut session, text, None, &config).await?;
/// println!("{} at {:?}", record.display_name(), record.location);
/// # Ok(())
/// # }
/// ```
pub async fn submit<'c>(
    collection: &'c mut RecordCollection,
    raw: &str,
    image: Option<ImageSource>,
    config: &ExtractionConfig,
) -> Result<&'c AlertRecord, AlertError> {
    let fields = extract_fields(raw, config)?;
    let record = materialize(fields, image, config).await?;
    info!("Added alert '{}'", record.display_name());
    Ok(collection.append(record))
}

/// Synchronous wrapper around [`submit`].
///
/// Creates a temporary tokio runtime internally.
pub fn submit_sync<'c>(
    collection: &'c mut RecordCollection,
    raw: &str,
    image: Option<ImageSource>,
    config: &ExtractionConfig,
) -> Result<&'c AlertRecord, AlertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AlertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(submit(collection, raw, image, config))
}

/// Serialise the whole collection and pick a file name for it.
pub fn export(collection: &RecordCollection, config: &ExtractionConfig) -> Result<KmlExport, AlertError> {
    let document = kml::serialize(collection, config.image_width)?;
    let filename = suggested_filename(collection.records(), &config.app_name);
    info!("Exported {} record(s) as '{}'", collection.len(), filename);
    Ok(KmlExport {
        filename,
        content_type: KML_CONTENT_TYPE,
        bytes: document.into_bytes(),
    })
}

/// Export and write to `output_path`.
///
/// If `output_path` is an existing directory the suggested file name is
/// used inside it. Uses atomic write (temp file + rename) to prevent
/// partial files. Returns the export with `filename` set to the final path.
pub async fn export_to_file(
    collection: &RecordCollection,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<KmlExport, AlertError> {
    let mut out = export(collection, config)?;
    let requested = output_path.as_ref();
    let path = if tokio::fs::metadata(requested)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        requested.join(&out.filename)
    } else {
        requested.to_path_buf()
    };

    let write_err = |e: std::io::Error| AlertError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("kml.tmp");
    tokio::fs::write(&tmp_path, &out.bytes)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote {}", path.display());
    out.filename = path.display().to_string();
    Ok(out)
}

/// `"<App> - <Category> - <MM.DD.YYYY>.kml"` for a single record,
/// `"<App> data.kml"` otherwise.
pub fn suggested_filename(records: &[AlertRecord], app_name: &str) -> String {
    match records {
        [only] => format!(
            "{} - {} - {}.kml",
            app_name,
            sanitize_filename_part(&only.category),
            only.filename_date
        ),
        _ => format!("{} data.kml", app_name),
    }
}
