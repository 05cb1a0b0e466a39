//! Document export to Markdown, HTML and PDF.
//!
//! Markdown and HTML exports are complete files. The two PDF formats produce
//! an HTML page that the user's browser turns into a PDF: `PdfPrint` through
//! the print dialog, `PdfRaster` by rasterizing the page and slicing it across
//! A4 pages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use thiserror::Error;

use crate::document::render_html;

const STANDALONE_TEMPLATE: &str = include_str!("templates/standalone.html");
const PRINT_TEMPLATE: &str = include_str!("templates/print.html");
const RASTER_TEMPLATE: &str = include_str!("templates/raster.html");

/// Width of the rasterized container, in CSS pixels.
pub const RASTER_WIDTH_PX: u32 = 800;
/// Device pixel ratio used when rasterizing.
pub const RASTER_SCALE: u32 = 2;
/// A4 portrait page size in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[value(name = "md")]
    Markdown,
    #[value(name = "html")]
    Html,
    #[value(name = "pdf-raster")]
    PdfRaster,
    #[value(name = "pdf-print")]
    PdfPrint,
}

impl ExportFormat {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
            Self::PdfRaster => "PDF (raster)",
            Self::PdfPrint => "PDF (print)",
        }
    }
}

/// How the artifact reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Saved as a file.
    Download,
    /// Written to a file and opened in the browser, which finishes the PDF.
    OpenInBrowser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub title: String,
    pub content: String,
    pub exported_on: NaiveDate,
}

impl ExportRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>, exported_on: NaiveDate) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            exported_on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("nothing to export: the document needs a title and content")]
    NothingToExport,
}

/// Build the artifact for `format`.
///
/// # Errors
/// Returns [`ExportError::NothingToExport`] when the title or content is empty.
pub fn export(format: ExportFormat, request: &ExportRequest) -> Result<ExportArtifact, ExportError> {
    if request.title.trim().is_empty() || request.content.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let artifact = match format {
        ExportFormat::Markdown => export_markdown(request),
        ExportFormat::Html => export_html(request),
        ExportFormat::PdfPrint => export_pdf_print(request),
        ExportFormat::PdfRaster => export_pdf_raster(request),
    };
    tracing::debug!(
        format = format.label(),
        file = %artifact.file_name,
        bytes = artifact.bytes.len(),
        "export built"
    );
    Ok(artifact)
}

fn export_markdown(request: &ExportRequest) -> ExportArtifact {
    ExportArtifact {
        file_name: format!("{}.md", sanitize_filename(&request.title)),
        mime: "text/markdown;charset=utf-8",
        bytes: request.content.clone().into_bytes(),
        delivery: Delivery::Download,
    }
}

fn export_html(request: &ExportRequest) -> ExportArtifact {
    let page = fill_template(
        STANDALONE_TEMPLATE,
        &[
            ("title", escape_html(&request.title)),
            ("body", render_html(&request.content)),
            ("footer", footer(request.exported_on)),
        ],
    );
    ExportArtifact {
        file_name: format!("{}.html", sanitize_filename(&request.title)),
        mime: "text/html;charset=utf-8",
        bytes: page.into_bytes(),
        delivery: Delivery::Download,
    }
}

fn export_pdf_print(request: &ExportRequest) -> ExportArtifact {
    let page = fill_template(
        PRINT_TEMPLATE,
        &[
            ("title", escape_html(&request.title)),
            ("body", render_html(&request.content)),
            ("footer", footer(request.exported_on)),
        ],
    );
    ExportArtifact {
        file_name: format!("{}.print.html", sanitize_filename(&request.title)),
        mime: "text/html;charset=utf-8",
        bytes: page.into_bytes(),
        delivery: Delivery::OpenInBrowser,
    }
}

fn export_pdf_raster(request: &ExportRequest) -> ExportArtifact {
    let name = sanitize_filename(&request.title);
    let page = fill_template(
        RASTER_TEMPLATE,
        &[
            ("title", escape_html(&request.title)),
            ("body", render_html(&request.content)),
            ("footer", footer(request.exported_on)),
            ("scale", RASTER_SCALE.to_string()),
            ("width", RASTER_WIDTH_PX.to_string()),
            ("file_name", format!("{name}.pdf")),
        ],
    );
    ExportArtifact {
        file_name: format!("{name}.pdf.html"),
        mime: "text/html;charset=utf-8",
        bytes: page.into_bytes(),
        delivery: Delivery::OpenInBrowser,
    }
}

fn footer(date: NaiveDate) -> String {
    format!("Exported from Markdraft - {}", date.format("%Y-%m-%d"))
}

/// Substitute `{{key}}` placeholders in one pass over the template.
///
/// Values are inserted verbatim and never rescanned, so rendered content that
/// happens to contain a placeholder is left alone.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// File-system-safe base name for a document title.
///
/// Non-alphanumerics become `_`, runs collapse, the ends are trimmed and the
/// result is lowercased. An empty result becomes `document`.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        let mapped = if ch.is_ascii_alphanumeric() {
            ch.to_ascii_lowercase()
        } else {
            '_'
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Vertical image offsets, in millimetres, for each page of a raster PDF.
///
/// The first page draws the image at offset 0. Each further page shifts the
/// image up by one page height while any of it remains below the fold.
pub fn raster_page_offsets(image_height: f64, page_height: f64) -> Vec<f64> {
    let mut offsets = vec![0.0];
    if page_height <= 0.0 {
        return offsets;
    }
    let mut height_left = image_height - page_height;
    while height_left >= 0.0 {
        offsets.push(height_left - image_height);
        height_left -= page_height;
    }
    offsets
}

/// Minimal HTML escaping for text placed in markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Write the artifact into `output` (a directory or a file path) or the
/// current directory, returning the written path.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_artifact(artifact: &ExportArtifact, output: Option<&Path>) -> Result<PathBuf> {
    let path = match output {
        Some(path) if path.is_dir() => path.join(&artifact.file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&artifact.file_name),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Open a written artifact with the platform's default handler.
///
/// # Errors
/// Returns an error if the opener cannot be spawned.
pub fn open_in_browser(path: &Path) -> std::io::Result<()> {
    let target = path.to_string_lossy();
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(target.as_ref())
            .spawn()?
            .wait()?;
        Ok(())
    }
    #[cfg(target_os = "windows")]
    {
        use std::process::Stdio;
        std::process::Command::new("cmd")
            .args(["/C", "start", "", target.as_ref()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        return Ok(());
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        std::process::Command::new("xdg-open")
            .arg(target.as_ref())
            .spawn()?
            .wait()?;
        Ok(())
    }
}

/// One-line summary of a finished export for the status bar or stdout.
pub fn describe(artifact: &ExportArtifact, path: &Path) -> String {
    let mut line = format!("Exported {} ({} bytes)", path.display(), artifact.bytes.len());
    if artifact.delivery == Delivery::OpenInBrowser {
        line.push_str("; finish the PDF in your browser");
    }
    line
}
