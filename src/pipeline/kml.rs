//! KML serialisation of alert records.
//!
//! The document is written event by event with [`quick_xml::Writer`] and no
//! indentation, so the output is a single line with no whitespace between
//! tags. Text that must keep embedded HTML (the description with its
//! `<img>` tag, the `<br/>`-joined metadata) goes into CDATA sections;
//! everything else is escaped text.
//!
//! ```text
//! <kml><Document>
//!   <Placemark>
//!     <name>Title — Category</name>
//!     <description><![CDATA[<img …/><br/><br/>Category: …<br/>Timestamp: …<br/>…]]></description>
//!     <ExtendedData>
//!       <Data name="Category"><value>…</value></Data>
//!       <Data name="Timestamp"><value>…</value></Data>
//!       <Data name="Metadata"><value><![CDATA[line<br/>line]]></value></Data>   (only if any)
//!     </ExtendedData>
//!     <Point><coordinates>lng,lat,0</coordinates></Point>
//!   </Placemark>
//! </Document></kml>
//! ```

use crate::error::AlertError;
use crate::record::AlertRecord;
use quick_xml::escape::escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use tracing::debug;

/// KML 2.2 namespace.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// MIME type of the exported document.
pub const KML_CONTENT_TYPE: &str = "application/vnd.google-earth.kml+xml";

/// A finished KML document plus the name it should be saved under.
#[derive(Debug, Clone, Serialize)]
pub struct KmlExport {
    pub filename: String,
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Render `records` as a compact KML document.
///
/// `image_width` sets the `width` attribute of embedded photos.
pub fn serialize<'a, I>(records: I, image_width: u32) -> Result<String, AlertError>
where
    I: IntoIterator<Item = &'a AlertRecord>,
{
    let mut w = KmlWriter::new();
    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.event(Event::Start(
        BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]),
    ))?;
    w.start("Document")?;

    let mut count = 0usize;
    for record in records {
        write_placemark(&mut w, record, image_width)?;
        count += 1;
    }

    w.end("Document")?;
    w.end("kml")?;

    let kml = w.finish()?;
    debug!("Serialised {} placemark(s), {} bytes", count, kml.len());
    Ok(kml)
}

fn write_placemark(w: &mut KmlWriter, record: &AlertRecord, image_width: u32) -> Result<(), AlertError> {
    w.start("Placemark")?;

    w.text_element("name", &record.display_name())?;

    w.start("description")?;
    w.cdata(&description_html(record, image_width))?;
    w.end("description")?;

    w.start("ExtendedData")?;
    w.data_text("Category", &record.category)?;
    w.data_text("Timestamp", &record.timestamp)?;
    if !record.metadata.is_empty() {
        let joined = record
            .metadata
            .iter()
            .map(|line| escape(line.as_str()))
            .collect::<Vec<_>>()
            .join("<br/>");
        w.event(Event::Start(
            BytesStart::new("Data").with_attributes([("name", "Metadata")]),
        ))?;
        w.start("value")?;
        w.cdata(&joined)?;
        w.end("value")?;
        w.end("Data")?;
    }
    w.end("ExtendedData")?;

    w.start("Point")?;
    w.text_element(
        "coordinates",
        &format!("{},{},0", record.location.longitude, record.location.latitude),
    )?;
    w.end("Point")?;

    w.end("Placemark")
}

/// HTML shown in the placemark balloon.
fn description_html(record: &AlertRecord, image_width: u32) -> String {
    let mut html = String::new();
    if let Some(ref img) = record.image {
        html.push_str(&format!(
            r#"<img src="{}" width="{}"/><br/><br/>"#,
            escape(img.data_uri().as_str()),
            image_width
        ));
    }
    html.push_str(&format!(
        "Category: {}<br/>Timestamp: {}<br/>{}<br/>",
        escape(record.category.as_str()),
        escape(record.timestamp.as_str()),
        escape(record.display_name().as_str()),
    ));
    html
}

/// Thin wrapper that maps writer failures onto [`AlertError::Serialize`].
struct KmlWriter {
    inner: Writer<Vec<u8>>,
}

impl KmlWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), AlertError> {
        self.inner
            .write_event(event)
            .map_err(|e| AlertError::Serialize(e.to_string()))
    }

    fn start(&mut self, name: &str) -> Result<(), AlertError> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<(), AlertError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), AlertError> {
        self.start(name)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// `<Data name="…"><value>text</value></Data>`
    fn data_text(&mut self, name: &str, text: &str) -> Result<(), AlertError> {
        self.event(Event::Start(
            BytesStart::new("Data").with_attributes([("name", name)]),
        ))?;
        self.text_element("value", text)?;
        self.end("Data")
    }

    /// Write `content` as CDATA, splitting around any `]]>` so the section
    /// cannot terminate early.
    fn cdata(&mut self, content: &str) -> Result<(), AlertError> {
        let mut rest = content;
        while let Some(pos) = rest.find("]]>") {
            let (head, tail) = rest.split_at(pos + 2);
            self.event(Event::CData(BytesCData::new(head)))?;
            rest = tail;
        }
        self.event(Event::CData(BytesCData::new(rest)))
    }

    fn finish(self) -> Result<String, AlertError> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| AlertError::Serialize(format!("non-UTF-8 output: {e}")))
    }
}

/// Replace characters that are unsafe in file names on common platforms.
pub fn sanitize_filename_part(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
