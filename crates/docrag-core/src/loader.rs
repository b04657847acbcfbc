//! Document loaders, one per supported format.
//!
//! The format is picked from the file extension before anything is read, so an
//! unsupported file never reaches the chunker.

use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Metadata, MetaValue, ParsedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Csv,
    PlainText,
    Markdown,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "csv" => Ok(Self::Csv),
            "txt" => Ok(Self::PlainText),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Csv => "csv",
            Self::PlainText => "txt",
            Self::Markdown => "markdown",
        }
    }

    /// Read `path` into normalized text plus loader metadata.
    pub fn parse(self, path: &Path) -> Result<ParsedDocument> {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), MetaValue::Text(path.to_string_lossy().to_string()));
        metadata.insert("format".into(), MetaValue::Text(self.name().to_string()));

        let text = match self {
            Self::PlainText | Self::Markdown => read_text_lossy(path)?,
            Self::Csv => {
                let (text, rows) = read_csv(path)?;
                metadata.insert("rows".into(), MetaValue::from(rows));
                text
            }
            Self::Docx => {
                let (text, paragraphs) = read_docx(path)?;
                metadata.insert("paragraphs".into(), MetaValue::from(paragraphs));
                text
            }
            Self::Pdf => read_pdf(path)?,
        };
        debug!(path = %path.display(), format = self.name(), bytes = text.len(), "parsed document");
        Ok(ParsedDocument { text: normalize_text(&text), metadata })
    }
}

/// CRLF/CR to LF, strip a leading BOM.
pub fn normalize_text(text: &str) -> String {
    text.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n")
}

fn read_text_lossy(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            warn!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(&fs::read(path)?).to_string())
        }
        Err(e) => Err(e.into()),
    }
}

/// One block per row, `header: value` per line, rows separated by a blank line.
fn read_csv(path: &Path) -> Result<(String, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;
    let headers = reader
        .headers()
        .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?
        .clone();
    let mut blocks = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;
        let lines: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(i, value)| match headers.get(i) {
                Some(h) if !h.is_empty() => format!("{}: {}", h.trim(), value.trim()),
                _ => value.trim().to_string(),
            })
            .collect();
        blocks.push(lines.join("\n"));
    }
    let rows = blocks.len();
    Ok((blocks.join("\n\n"), rows))
}

fn read_docx(path: &Path) -> Result<(String, usize)> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::Parse(format!("{}: missing word/document.xml ({})", path.display(), e)))?
        .read_to_string(&mut xml)?;
    docx_xml_to_text(&xml)
}

/// Paragraph ends and breaks become newlines, tabs stay tabs, other tags vanish.
pub fn docx_xml_to_text(xml: &str) -> Result<(String, usize)> {
    let pattern = |p: &str| Regex::new(p).map_err(|e| Error::Parse(e.to_string()));
    let breaks = pattern(r"</w:p>|<w:br\s*/>|<w:cr\s*/>")?;
    let tabs = pattern(r"<w:tab\s*/>")?;
    let tags = pattern(r"<[^>]*>")?;

    let paragraphs = xml.matches("</w:p>").count();
    let text = breaks.replace_all(xml, "\n");
    let text = tabs.replace_all(&text, "\t");
    let text = tags.replace_all(&text, "");
    let text = decode_entities(&text);
    Ok((text.trim_end_matches('\n').to_string(), paragraphs))
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn read_pdf(path: &Path) -> Result<String> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| Error::Parse(format!("pdftotext could not be run ({e}); is poppler installed?")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Parse(format!("pdftotext failed for {}: {}", path.display(), stderr.trim())));
    }
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    if text.trim().is_empty() {
        return Err(Error::Parse(format!("pdftotext produced no text for {}", path.display())));
    }
    Ok(text.replace('\u{c}', "\n\n"))
}
