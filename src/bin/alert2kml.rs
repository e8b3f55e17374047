//! CLI binary for mapeo-alert-kml.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, feeds each message through the pipeline and writes
//! the resulting KML.

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use mapeo_alert_kml::{
    export_to_file, extract_fields, materialize, ExtractionConfig, ImageSource, Layout,
    RecordCollection,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One structured report with a photo
  alert2kml report.txt --image photo.jpg

  # Several inline reports into one file
  alert2kml --layout inline a.txt b.txt c.txt -o alerts.kml

  # Pipe a message in and inspect the extracted fields
  pbpaste | alert2kml - --json

MESSAGE LAYOUTS:
  structured (default)     Flood report — Flooding
                           March 5, 2024, 10:15 AM
                           UTM 18N 500000 4649776
                           Water rising near the school

  inline                   Mapeo Alert — Flooding UTM 18N 500000 4649776 water rising

OUTPUT:
  One message  → "<App> - <Category> - <MM.DD.YYYY>.kml"
  Several      → "<App> data.kml"
  -o may name a file or an existing directory.
"#;

/// Extract geolocated alerts from field reports and export them as KML.
#[derive(Parser, Debug)]
#[command(
    name = "alert2kml",
    version,
    about = "Extract geolocated alerts from field reports and export them as KML",
    long_about = "Reads free-text field reports (title, category, timestamp, UTM position and notes), \
converts the UTM position to WGS84 and writes one KML placemark per report. \
Photos can be attached and are embedded in the placemark description.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Message files; `-` reads one message from stdin.
    #[arg(required = true)]
    messages: Vec<PathBuf>,

    /// Write KML to this file or directory instead of the current directory.
    #[arg(short, long, env = "ALERT2KML_OUTPUT")]
    output: Option<PathBuf>,

    /// Photo for the message in the same position (repeatable).
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Message layout: inline or structured.
    #[arg(long, env = "ALERT2KML_LAYOUT", value_enum, default_value = "structured")]
    layout: LayoutArg,

    /// Application name used in the output file name.
    #[arg(long, env = "ALERT2KML_APP_NAME", default_value = "Mapeo")]
    app_name: String,

    /// Seconds to wait for one photo to be read and encoded.
    #[arg(long, env = "ALERT2KML_IMAGE_TIMEOUT", default_value_t = 30)]
    image_timeout: u64,

    /// Width of embedded photos in the placemark balloon, in pixels.
    #[arg(long, env = "ALERT2KML_IMAGE_WIDTH", default_value_t = 400)]
    image_width: u32,

    /// Print the extracted records as JSON instead of writing KML.
    #[arg(long, env = "ALERT2KML_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ALERT2KML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ALERT2KML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ALERT2KML_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LayoutArg {
    Inline,
    Structured,
}

impl From<LayoutArg> for Layout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::Inline => Layout::Inline,
            LayoutArg::Structured => Layout::Structured,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.images.len() > cli.messages.len() {
        anyhow::bail!(
            "{} images given for {} messages; each --image pairs with one message",
            cli.images.len(),
            cli.messages.len()
        );
    }

    let config = build_config(&cli)?;

    // ── Read messages ────────────────────────────────────────────────────
    let mut texts = Vec::with_capacity(cli.messages.len());
    for path in &cli.messages {
        texts.push(read_message(path).await?);
    }

    let bar = if show_progress {
        let bar = ProgressBar::new(texts.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} messages",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    } else {
        ProgressBar::hidden()
    };

    // ── Stage 1: extract fields (sync) ───────────────────────────────────
    let mut pending = Vec::new();
    let mut failed = 0usize;
    for (idx, text) in texts.iter().enumerate() {
        let label = cli.messages[idx].display().to_string();
        match extract_fields(text, &config) {
            Ok(fields) => {
                let image = cli.images.get(idx).cloned().map(ImageSource::Path);
                pending.push((label, fields, image));
            }
            Err(e) => {
                failed += 1;
                report(&bar, cli.quiet, format!("  {} {}  {}", red("✗"), label, e));
                bar.inc(1);
            }
        }
    }

    // ── Stage 2: encode images concurrently, append in input order ──────
    let labels: Vec<String> = pending.iter().map(|(l, _, _)| l.clone()).collect();
    let records = join_all(
        pending
            .into_iter()
            .map(|(_, fields, image)| materialize(fields, image, &config)),
    )
    .await;

    let mut session = RecordCollection::new();
    for (label, result) in labels.into_iter().zip(records) {
        match result {
            Ok(record) => {
                let line = format!(
                    "  {} {}  {}  {}",
                    green("✓"),
                    label,
                    record.display_name(),
                    dim(&format!(
                        "{:.6}, {:.6}",
                        record.location.latitude, record.location.longitude
                    )),
                );
                session.append(record);
                report(&bar, cli.quiet, line);
            }
            Err(e) => {
                failed += 1;
                report(&bar, cli.quiet, format!("  {} {}  {}", red("✗"), label, e));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    if session.is_empty() {
        anyhow::bail!("No alert records could be created from {} message(s)", texts.len());
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&session).context("Failed to serialise records")?;
        println!("{json}");
        return Ok(());
    }

    let target = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    let written = export_to_file(&session, &target, &config)
        .await
        .context("Failed to write KML")?;

    if !cli.quiet {
        eprintln!(
            "{}  {}/{} messages  →  {}",
            if failed == 0 { green("✔") } else { red("⚠") },
            session.len(),
            texts.len(),
            bold(&written.filename),
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    ExtractionConfig::builder()
        .layout(cli.layout.clone().into())
        .app_name(cli.app_name.clone())
        .image_timeout_secs(cli.image_timeout)
        .image_width(cli.image_width)
        .build()
        .context("Invalid configuration")
}

/// Read one message from a file, or from stdin for `-`.
async fn read_message(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read message from stdin")?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read message from {:?}", path))
    }
}

/// Print a per-message line above the progress bar (or plainly if hidden).
fn report(bar: &ProgressBar, quiet: bool, line: String) {
    if quiet {
        return;
    }
    if bar.is_hidden() {
        eprintln!("{line}");
    } else {
        bar.println(line);
    }
}
