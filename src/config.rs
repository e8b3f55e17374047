//! Configuration types for alert extraction and KML export.
//!
//! Field reports arrive in two shapes, and each extraction pass has one
//! strategy per shape. Rather than guessing per message, every strategy is an
//! explicit enum value held in [`ExtractionConfig`]:
//!
//! | Pass      | Inline message                    | Structured message              |
//! |-----------|-----------------------------------|---------------------------------|
//! | Normalise | [`NormalizeMode::Flatten`]        | [`NormalizeMode::PreserveLines`]|
//! | Category  | [`CategoryStrategy::Marker`]      | [`CategoryStrategy::HeaderLine`]|
//! | Metadata  | [`MetadataStrategy::AfterCoordinates`] | [`MetadataStrategy::AfterHeader`] |
//!
//! [`Layout`] bundles each column into a preset; the builder can still
//! override a single pass.

use crate::error::AlertError;
use serde::{Deserialize, Serialize};

/// Default application name used in placemark file names.
pub const DEFAULT_APP_NAME: &str = "Mapeo";

/// Configuration for extracting and exporting alert records.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use mapeo_alert_kml::{ExtractionConfig, Layout};
///
/// let config = ExtractionConfig::builder()
///     .layout(Layout::Inline)
///     .app_name("Mapeo")
///     .image_timeout_secs(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Prefix of every suggested file name. Default: "Mapeo".
    pub app_name: String,

    /// Whitespace handling before extraction. Default: PreserveLines.
    pub normalize: NormalizeMode,

    /// How the category is located. Default: HeaderLine.
    pub category: CategoryStrategy,

    /// Which text counts as metadata. Default: AfterHeader.
    pub metadata: MetadataStrategy,

    /// Upper bound on reading and encoding one image, in seconds. Default: 30.
    ///
    /// An image that never finishes encoding is reported as
    /// [`AlertError::ImageTimeout`] and its record is not appended.
    pub image_timeout_secs: u64,

    /// Width attribute of the `<img>` tag embedded in descriptions. Default: 400.
    pub image_width: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::for_layout(Layout::default())
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default configuration with every pass set from `layout`.
    pub fn for_layout(layout: Layout) -> Self {
        let (normalize, category, metadata) = layout.strategies();
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            normalize,
            category,
            metadata,
            image_timeout_secs: 30,
            image_width: 400,
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    /// Set all three strategies from a preset. Call before per-pass overrides.
    pub fn layout(mut self, layout: Layout) -> Self {
        let (normalize, category, metadata) = layout.strategies();
        self.config.normalize = normalize;
        self.config.category = category;
        self.config.metadata = metadata;
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    pub fn normalize(mut self, mode: NormalizeMode) -> Self {
        self.config.normalize = mode;
        self
    }

    pub fn category(mut self, strategy: CategoryStrategy) -> Self {
        self.config.category = strategy;
        self
    }

    pub fn metadata(mut self, strategy: MetadataStrategy) -> Self {
        self.config.metadata = strategy;
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs.max(1);
        self
    }

    pub fn image_width(mut self, px: u32) -> Self {
        self.config.image_width = px.clamp(16, 4096);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, AlertError> {
        let c = &self.config;
        if c.app_name.trim().is_empty() {
            return Err(AlertError::InvalidConfig(
                "app name must not be empty".into(),
            ));
        }
        if c.app_name.contains(['/', '\\']) {
            return Err(AlertError::InvalidConfig(format!(
                "app name must not contain path separators, got '{}'",
                c.app_name
            )));
        }
        if c.image_timeout_secs == 0 {
            return Err(AlertError::InvalidConfig(
                "image timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Message shape presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Layout {
    /// Everything on one run of text:
    /// `Mapeo Alert — Flooding UTM 18N 500000 4649776 water rising`.
    Inline,
    /// One field per line: `Title — Category`, date, location, then metadata. (default)
    #[default]
    Structured,
}

impl Layout {
    fn strategies(self) -> (NormalizeMode, CategoryStrategy, MetadataStrategy) {
        match self {
            Layout::Inline => (
                NormalizeMode::Flatten,
                CategoryStrategy::Marker,
                MetadataStrategy::AfterCoordinates,
            ),
            Layout::Structured => (
                NormalizeMode::PreserveLines,
                CategoryStrategy::HeaderLine,
                MetadataStrategy::AfterHeader,
            ),
        }
    }
}

/// What the normaliser does with line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Join all lines into one, separated by single spaces.
    Flatten,
    /// Keep one field per line; only blank lines and padding are removed. (default)
    #[default]
    PreserveLines,
}

/// How the category field is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryStrategy {
    /// Text after the `Alert —` marker, up to the coordinates or date. When
    /// the marker is absent, the first non-empty line after the coordinate line.
    Marker,
    /// Second em-dash segment of the first line: `Title — Category`. (default)
    #[default]
    HeaderLine,
}

/// Which part of the message becomes opaque metadata lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetadataStrategy {
    /// Everything after the matched northing value.
    AfterCoordinates,
    /// Every non-empty line after the title, date and location lines. (default)
    #[default]
    AfterHeader,
}
