//! Field extraction: recover typed fields from a normalised message.
//!
//! Each extractor is an independent, pure function over the normalised text.
//! Only [`extract_coordinate`] can fail the pipeline; every other extractor
//! falls back to a documented placeholder (see [`crate::record`]).
//!
//! Extraction is best-effort pattern matching, not a grammar. Patterns were
//! written against real Mapeo exports:
//!
//! ```text
//! Inline      Mapeo Alert — Flooding March 5, 2024, 10:15 AM UTM 18N 500000 4649776 water rising
//!
//! Structured  Flood report — Flooding
//!             Tuesday, March 5, 2024 10:15:30 AM EST
//!             UTM 18N 500000 4649776
//!             Water rising near the school
//! ```

use crate::config::{CategoryStrategy, MetadataStrategy};
use crate::record::{RawCoordinateMatch, UNKNOWN_CATEGORY, UNKNOWN_DATE, UNKNOWN_TITLE};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// English and Spanish month names, full then abbreviated.
///
/// Grouped in blocks of twelve, so `index % 12 + 1` is the month number.
const MONTH_NAMES: [&str; 48] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December", //
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio", "Julio", "Agosto", "Septiembre",
    "Octubre", "Noviembre", "Diciembre", //
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", //
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

const EM_DASH: char = '—';

// ── Coordinates ──────────────────────────────────────────────────────────────

static RE_COORDINATES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UTM\s+(\d{1,2}[A-Z])\s+(\d{6,7})\s+(\d{7,8})").unwrap());

/// Find the first `UTM <zone> <easting> <northing>` triple.
///
/// Returns `None` when the message has no coordinates; the caller turns that
/// into [`crate::AlertError::CoordinatesNotFound`].
pub fn extract_coordinate(text: &str) -> Option<RawCoordinateMatch> {
    let caps = RE_COORDINATES.captures(text)?;
    let northing = caps.get(3)?;
    let found = RawCoordinateMatch {
        zone_label: caps[1].to_string(),
        easting: caps[2].parse().ok()?,
        northing: northing.as_str().parse().ok()?,
        end: northing.end(),
    };
    debug!(
        "Coordinates: zone {} E {} N {}",
        found.zone_label, found.easting, found.northing
    );
    Some(found)
}

fn is_coordinate_line(line: &str) -> bool {
    RE_COORDINATES.is_match(line)
}

// ── Timestamp ────────────────────────────────────────────────────────────────

/// "March 5, 2024, 10:15 AM"
static RE_TIMESTAMP_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w+ \d{1,2}, \d{4}, \d{1,2}:\d{2} [APM]{2}\b").unwrap());

/// "Tuesday, March 5, 2024 10:15:30 AM EST"
static RE_TIMESTAMP_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w+,\s\w+ \d{1,2}, \d{4} \d{1,2}:\d{2}:\d{2} [APM]{2} \w{3}\b").unwrap()
});

/// "5 Marzo 2024 10:15", "5 mar., 2024 10:15"
static RE_TIMESTAMP_LOCALIZED: Lazy<Regex> = Lazy::new(|| {
    let months = MONTH_NAMES.join("|");
    Regex::new(&format!(
        r"(?i)\b\d{{1,2}} ({months})\.?,? \d{{4}} \d{{1,2}}:\d{{2}}\b"
    ))
    .unwrap()
});

/// Return the first timestamp found, verbatim, or `"Unknown Date"`.
///
/// Patterns are tried in priority order over the whole text; the first
/// pattern with any match wins even if a later pattern matches earlier in
/// the text.
pub fn extract_timestamp(text: &str) -> String {
    let patterns: [&Lazy<Regex>; 3] = [
        &RE_TIMESTAMP_SHORT,
        &RE_TIMESTAMP_LONG,
        &RE_TIMESTAMP_LOCALIZED,
    ];
    for re in patterns {
        if let Some(m) = re.find(text) {
            return m.as_str().to_string();
        }
    }
    debug!("No timestamp pattern matched; using '{}'", UNKNOWN_DATE);
    UNKNOWN_DATE.to_string()
}

// ── Category ─────────────────────────────────────────────────────────────────

static RE_ALERT_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\balert\s*[—–]\s*").unwrap());

static RE_COORDINATE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bUTM\b").unwrap());

/// "5, 2024" or "5 Marzo 2024"
static RE_DATE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}(?:,? \d{4}| \p{L}+\.?,? \d{4})\b").unwrap());

/// Extract the alert category using `strategy`.
///
/// `timestamp` is the output of [`extract_timestamp`]; both strategies use it
/// to cut the category short where the date begins.
pub fn extract_category(text: &str, timestamp: &str, strategy: CategoryStrategy) -> String {
    let found = match strategy {
        CategoryStrategy::Marker => {
            category_after_marker(text, timestamp).or_else(|| category_after_coordinates(text))
        }
        CategoryStrategy::HeaderLine => category_from_header(text, timestamp),
    };
    found.unwrap_or_else(|| {
        debug!("No category found ({strategy:?}); using '{}'", UNKNOWN_CATEGORY);
        UNKNOWN_CATEGORY.to_string()
    })
}

fn category_after_marker(text: &str, timestamp: &str) -> Option<String> {
    let marker = RE_ALERT_MARKER.find(text)?;
    cut_before_fields(&text[marker.end()..], timestamp)
}

/// Take `rest` up to the first line break, `UTM` marker, timestamp or
/// date-like token, then drop any dangling date words and punctuation.
fn cut_before_fields(rest: &str, timestamp: &str) -> Option<String> {
    let mut cut = rest.len();
    let mut cut_by_date = false;
    if let Some(m) = RE_COORDINATE_MARKER.find(rest) {
        cut = cut.min(m.start());
    }
    if let Some(pos) = rest.find('\n') {
        cut = cut.min(pos);
    }
    if timestamp != UNKNOWN_DATE {
        if let Some(pos) = rest.find(timestamp) {
            cut = cut.min(pos);
        }
    }
    if let Some(m) = RE_DATE_LIKE.find(rest) {
        if m.start() < cut {
            cut = m.start();
            cut_by_date = true;
        }
    }

    let mut candidate = rest[..cut].trim();
    if timestamp != UNKNOWN_DATE {
        candidate = strip_timestamp_prefix(candidate, timestamp);
    }
    if cut_by_date {
        candidate = strip_trailing_month(candidate);
    }
    let candidate = candidate.trim_end_matches(|c: char| c.is_whitespace() || ",;:-—–".contains(c));

    (!candidate.is_empty()).then(|| candidate.to_string())
}

/// Remove the longest trailing fragment equal to the first words of `timestamp`.
///
/// `"Flooding Tuesday, March"` with timestamp `"Tuesday, March 5, …"` → `"Flooding"`.
fn strip_timestamp_prefix<'a>(candidate: &'a str, timestamp: &str) -> &'a str {
    let words: Vec<&str> = timestamp.split_whitespace().collect();
    for k in (1..=words.len()).rev() {
        let fragment = words[..k].join(" ");
        if let Some(head) = candidate.strip_suffix(fragment.as_str()) {
            if head.is_empty() || head.ends_with(char::is_whitespace) {
                return head.trim_end();
            }
        }
    }
    candidate
}

/// `"Flooding March"` → `"Flooding"` when the date cut left a month name behind.
fn strip_trailing_month(candidate: &str) -> &str {
    match candidate.rsplit_once(char::is_whitespace) {
        Some((head, last)) if month_number(last).is_some() => head.trim_end(),
        _ => candidate,
    }
}

fn category_after_coordinates(text: &str) -> Option<String> {
    text.lines()
        .skip_while(|line| !is_coordinate_line(line))
        .skip(1)
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn category_from_header(text: &str, timestamp: &str) -> Option<String> {
    let header = first_line(text)?;
    cut_before_fields(header.split(EM_DASH).nth(1)?, timestamp)
}

// ── Metadata ─────────────────────────────────────────────────────────────────

/// Collect the free-form lines that follow the structured fields.
///
/// Lines are trimmed, empty lines dropped, order kept. Nothing else is
/// interpreted.
pub fn extract_metadata(
    text: &str,
    coordinate: &RawCoordinateMatch,
    strategy: MetadataStrategy,
) -> Vec<String> {
    let lines: Vec<String> = match strategy {
        MetadataStrategy::AfterCoordinates => text
            .get(coordinate.end..)
            .map(non_empty_lines)
            .unwrap_or_default(),
        MetadataStrategy::AfterHeader => {
            text.lines().skip(3).flat_map(non_empty_lines).collect()
        }
    };
    debug!("Metadata: {} line(s) ({strategy:?})", lines.len());
    lines
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Title ────────────────────────────────────────────────────────────────────

/// The part of the first line before the first em-dash.
///
/// A first line without an em-dash is the title as a whole, unless it is the
/// coordinate line itself (common for flattened inline messages).
pub fn extract_title(text: &str) -> String {
    let title = first_line(text).and_then(|line| match line.split_once(EM_DASH) {
        Some((head, _)) => Some(head.trim()),
        None if is_coordinate_line(line) => None,
        None => Some(line),
    });
    match title {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNKNOWN_TITLE.to_string(),
    }
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

// ── Filename dates ───────────────────────────────────────────────────────────

/// Fragment used when a timestamp cannot be read as a calendar date.
pub const UNDATED: &str = "undated";

static RE_ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

/// "March 5, 2024" / "Mar. 5 2024"
static RE_MONTH_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\p{L}+)\.? (\d{1,2}),? (\d{4})\b").unwrap());

/// "5 Marzo 2024" / "5 mar., 2024"
static RE_DAY_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}) (\p{L}+)\.?,? (\d{4})\b").unwrap());

/// Format a timestamp as `MM.DD.YYYY` for use in file names.
///
/// Best-effort: understands the three timestamp shapes plus ISO dates.
/// Anything else (including `"Unknown Date"`) yields [`UNDATED`].
pub fn format_filename_date(timestamp: &str) -> String {
    match parse_calendar_date(timestamp) {
        Some(date) => date.format("%m.%d.%Y").to_string(),
        None => {
            debug!("'{}' is not a calendar date; using '{}'", timestamp, UNDATED);
            UNDATED.to_string()
        }
    }
}

fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    if let Some(c) = RE_ISO_DATE.captures(text) {
        if let Some(d) = ymd(&c[1], month_str(&c[2]), &c[3]) {
            return Some(d);
        }
    }
    RE_MONTH_FIRST
        .captures_iter(text)
        .find_map(|c| ymd(&c[3], month_number(&c[1]), &c[2]))
        .or_else(|| {
            RE_DAY_FIRST
                .captures_iter(text)
                .find_map(|c| ymd(&c[3], month_number(&c[2]), &c[1]))
        })
}

fn ymd(year: &str, month: Option<u32>, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month?, day.parse().ok()?)
}

fn month_str(digits: &str) -> Option<u32> {
    digits.parse().ok()
}

/// Month number for an English or Spanish name, full or abbreviated.
fn month_number(word: &str) -> Option<u32> {
    let word = word.trim_end_matches(['.', ',']);
    MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(word))
        .map(|i| (i % 12) as u32 + 1)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const INLINE: &str = "Mapeo Alert — Flooding UTM 18N 500000 4649776 water rising near the school";
    const STRUCTURED: &str = "Flood report — Flooding\nTuesday, March 5, 2024 10:15:30 AM EST\nUTM 18N 500000 4649776\nWater rising near the school\nTwo families evacuated";

    fn coord(text: &str) -> RawCoordinateMatch {
        extract_coordinate(text).expect("fixture has coordinates")
    }

    // Coordinates

    #[test]
    fn test_coordinate_found() {
        let c = coord(INLINE);
        assert_eq!(c.zone_label, "18N");
        assert_eq!(c.easting, 500000.0);
        assert_eq!(c.northing, 4649776.0);
        assert_eq!(&INLINE[..c.end], "Mapeo Alert — Flooding UTM 18N 500000 4649776");
    }

    #[test]
    fn test_coordinate_seven_digit_easting_eight_digit_northing() {
        let c = coord("UTM 5S 1234567 12345678");
        assert_eq!(c.zone_label, "5S");
        assert_eq!(c.easting, 1234567.0);
        assert_eq!(c.northing, 12345678.0);
    }

    #[test]
    fn test_coordinate_missing() {
        assert!(extract_coordinate("Mapeo Alert — Flooding near the river").is_none());
        assert!(extract_coordinate("UTM 18n 500000 4649776").is_none(), "band letter must be uppercase");
        assert!(extract_coordinate("UTM 18N 50000 4649776").is_none(), "easting needs 6+ digits");
    }

    // Timestamp

    #[test]
    fn test_timestamp_short_format() {
        let text = "Mapeo Alert — Fire March 5, 2024, 10:15 AM UTM 18N 500000 4649776";
        assert_eq!(extract_timestamp(text), "March 5, 2024, 10:15 AM");
    }

    #[test]
    fn test_timestamp_long_format() {
        assert_eq!(
            extract_timestamp(STRUCTURED),
            "Tuesday, March 5, 2024 10:15:30 AM EST"
        );
    }

    #[test]
    fn test_timestamp_localized_spanish() {
        let text = "Alerta — Inundación\n5 Marzo 2024 10:15\nUTM 18N 500000 4649776";
        assert_eq!(extract_timestamp(text), "5 Marzo 2024 10:15");
    }

    #[test]
    fn test_timestamp_localized_abbreviation_with_period() {
        assert_eq!(extract_timestamp("seen 12 sep., 2023 7:05 by patrol"), "12 sep., 2023 7:05");
    }

    #[test]
    fn test_timestamp_priority_order() {
        // The localized form appears first in the text, but the short form
        // has higher priority.
        let text = "5 Marzo 2024 10:15 then March 6, 2024, 11:00 AM";
        assert_eq!(extract_timestamp(text), "March 6, 2024, 11:00 AM");
    }

    #[test]
    fn test_timestamp_unknown() {
        assert_eq!(extract_timestamp("no date in here at all"), UNKNOWN_DATE);
    }

    // Category

    #[test]
    fn test_category_marker_inline() {
        let text = "Mapeo Alert — Flooding UTM 18N 500000 4649776 ...";
        assert_eq!(
            extract_category(text, UNKNOWN_DATE, CategoryStrategy::Marker),
            "Flooding"
        );
    }

    #[test]
    fn test_category_marker_stops_at_timestamp() {
        let text = "Mapeo Alert — Illegal logging March 5, 2024, 10:15 AM UTM 18N 500000 4649776";
        let ts = extract_timestamp(text);
        assert_eq!(
            extract_category(text, &ts, CategoryStrategy::Marker),
            "Illegal logging"
        );
    }

    #[test]
    fn test_category_marker_strips_partial_timestamp() {
        // The date-like cut lands on "5, 2024", leaving the weekday and month.
        let text = "Mapeo Alert — Fire Tuesday, March 5, 2024 UTM 18N 500000 4649776";
        let ts = "Tuesday, March 5, 2024 10:15:30 AM EST";
        assert_eq!(extract_category(text, ts, CategoryStrategy::Marker), "Fire");
    }

    #[test]
    fn test_category_marker_strips_month_without_timestamp() {
        let text = "Mapeo Alert — Fire March 5, 2024 UTM 18N 500000 4649776";
        assert_eq!(
            extract_category(text, UNKNOWN_DATE, CategoryStrategy::Marker),
            "Fire"
        );
    }

    #[test]
    fn test_category_marker_falls_back_to_line_after_coordinates() {
        let text = "Report from the north trail\nUTM 18N 500000 4649776\n\nLandslide\nRoad blocked";
        assert_eq!(
            extract_category(text, UNKNOWN_DATE, CategoryStrategy::Marker),
            "Landslide"
        );
    }

    #[test]
    fn test_category_header_line() {
        assert_eq!(
            extract_category(STRUCTURED, UNKNOWN_DATE, CategoryStrategy::HeaderLine),
            "Flooding"
        );
    }

    #[test]
    fn test_category_header_line_one_line_message() {
        let text = "Mapeo Alert — Flooding UTM 18N 500000 4649776 water rising";
        assert_eq!(
            extract_category(text, UNKNOWN_DATE, CategoryStrategy::HeaderLine),
            "Flooding"
        );

        let text = "Mapeo Alert — Fire March 5, 2024, 10:15 AM UTM 18N 500000 4649776";
        let ts = extract_timestamp(text);
        assert_eq!(extract_category(text, &ts, CategoryStrategy::HeaderLine), "Fire");
    }

    #[test]
    fn test_category_strategies_side_by_side() {
        let ts = extract_timestamp(STRUCTURED);
        // No "Alert —" marker: the marker strategy reads the line after the coordinates.
        assert_eq!(
            extract_category(STRUCTURED, &ts, CategoryStrategy::Marker),
            "Water rising near the school"
        );
        assert_eq!(
            extract_category(STRUCTURED, &ts, CategoryStrategy::HeaderLine),
            "Flooding"
        );
    }

    #[test]
    fn test_category_unknown() {
        assert_eq!(
            extract_category("just text", UNKNOWN_DATE, CategoryStrategy::Marker),
            UNKNOWN_CATEGORY
        );
        assert_eq!(
            extract_category("Title without dash", UNKNOWN_DATE, CategoryStrategy::HeaderLine),
            UNKNOWN_CATEGORY
        );
    }

    // Metadata

    #[test]
    fn test_metadata_after_coordinates_lines() {
        let text = "Mapeo Alert — Flooding\nUTM 18N 500000 4649776\nWater rising\n\nTwo families evacuated\n";
        let meta = extract_metadata(text, &coord(text), MetadataStrategy::AfterCoordinates);
        assert_eq!(meta, ["Water rising", "Two families evacuated"]);
    }

    #[test]
    fn test_metadata_after_coordinates_inline() {
        let meta = extract_metadata(INLINE, &coord(INLINE), MetadataStrategy::AfterCoordinates);
        assert_eq!(meta, ["water rising near the school"]);
    }

    #[test]
    fn test_metadata_after_header() {
        let meta = extract_metadata(STRUCTURED, &coord(STRUCTURED), MetadataStrategy::AfterHeader);
        assert_eq!(meta, ["Water rising near the school", "Two families evacuated"]);
    }

    #[test]
    fn test_metadata_empty() {
        let text = "Mapeo Alert — Flooding UTM 18N 500000 4649776";
        assert!(extract_metadata(text, &coord(text), MetadataStrategy::AfterCoordinates).is_empty());
        assert!(extract_metadata(text, &coord(text), MetadataStrategy::AfterHeader).is_empty());
    }

    // Title

    #[test]
    fn test_title_before_dash() {
        assert_eq!(extract_title(INLINE), "Mapeo Alert");
        assert_eq!(extract_title(STRUCTURED), "Flood report");
    }

    #[test]
    fn test_title_whole_line_without_dash() {
        assert_eq!(extract_title("River watch\nUTM 18N 500000 4649776"), "River watch");
    }

    #[test]
    fn test_title_unknown() {
        assert_eq!(extract_title("UTM 18N 500000 4649776 water"), UNKNOWN_TITLE);
        assert_eq!(extract_title("— Flooding"), UNKNOWN_TITLE);
        assert_eq!(extract_title(""), UNKNOWN_TITLE);
    }

    // Filename dates

    #[test]
    fn test_filename_date_formats() {
        assert_eq!(format_filename_date("March 5, 2024, 10:15 AM"), "03.05.2024");
        assert_eq!(
            format_filename_date("Tuesday, March 5, 2024 10:15:30 AM EST"),
            "03.05.2024"
        );
        assert_eq!(format_filename_date("15 Diciembre 2023 08:30"), "12.15.2023");
        assert_eq!(format_filename_date("7 ago., 2022 9:00"), "08.07.2022");
        assert_eq!(format_filename_date("2024-01-31"), "01.31.2024");
    }

    #[test]
    fn test_filename_date_fallback() {
        assert_eq!(format_filename_date(UNKNOWN_DATE), UNDATED);
        assert_eq!(format_filename_date("Smarch 5, 2024, 10:15 AM"), UNDATED);
        assert_eq!(format_filename_date("February 30, 2024, 10:15 AM"), UNDATED);
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("marzo"), Some(3));
        assert_eq!(month_number("Sep."), Some(9));
        assert_eq!(month_number("DIC"), Some(12));
        assert_eq!(month_number("Tuesday"), None);
    }
}
