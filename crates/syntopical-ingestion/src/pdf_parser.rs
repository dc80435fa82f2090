//! lopdf-based PDF extraction: metadata, page text and a heuristic abstract.
//!
//! Nothing here understands layout. Titles come from the Info dictionary when
//! present, and the abstract is located by scanning for well-known headings
//! in the flattened text. Both report which rule fired so callers can judge
//! how far to trust the result.

use anyhow::{Context, Result};
use lopdf::{Dictionary, Document, Object};
use std::path::Path;
use tracing::{debug, instrument, warn};

use crate::models::{
    AbstractBoundary, PaperContent, PaperMetadata, Sections, TitleSource, SECTION_ABSTRACT,
};

/// Characters taken for the abstract when no closing heading is found.
pub const ABSTRACT_WINDOW_CHARS: usize = 1500;

const ABSTRACT_LABEL: &str = "abstract";

/// Headings that may close an abstract when "introduction" is absent.
const FALLBACK_MARKERS: [(&str, AbstractBoundary); 4] = [
    ("keywords", AbstractBoundary::Keywords),
    ("1.", AbstractBoundary::NumberedHeading),
    ("i.", AbstractBoundary::RomanHeading),
    ("background", AbstractBoundary::Background),
];

// ── Public API ───────────────────────────────────────────────────────────────

/// Read title, authors and creation date from a PDF.
pub fn extract_metadata(path: &Path) -> Result<PaperMetadata> {
    let doc = load(path)?;
    Ok(metadata_from_document(&doc, path))
}

/// Concatenate the text of every page, each followed by a blank line.
pub fn extract_text(path: &Path) -> Result<String> {
    let doc = load(path)?;
    Ok(text_from_document(&doc))
}

/// Metadata, full text and detected sections in one pass over the file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn process_pdf(path: &Path) -> Result<PaperContent> {
    let doc = load(path)?;
    let mut metadata = metadata_from_document(&doc, path);
    let text = text_from_document(&doc);
    let Sections {
        sections,
        abstract_boundary,
    } = extract_sections(&text);

    if let Some(abstract_text) = sections.get(SECTION_ABSTRACT) {
        metadata.abstract_text = Some(abstract_text.clone());
    }

    debug!(
        title = %metadata.title,
        title_source = ?metadata.title_source,
        abstract_boundary = ?abstract_boundary,
        chars = text.chars().count(),
        "Processed PDF"
    );

    Ok(PaperContent {
        metadata,
        text,
        sections,
        abstract_boundary,
    })
}

/// Locate the abstract in flattened paper text.
///
/// The span starts at the first case-insensitive "abstract". It ends at the
/// next "introduction" if there is one, otherwise at the nearest of
/// "keywords", "1.", "i." or "background", otherwise after
/// [`ABSTRACT_WINDOW_CHARS`] characters.
pub fn extract_sections(text: &str) -> Sections {
    // ASCII folding keeps byte offsets identical between `lower` and `text`.
    let lower = text.to_ascii_lowercase();
    let Some(start) = lower.find(ABSTRACT_LABEL) else {
        return Sections::default();
    };
    let tail = &lower[start..];

    let (end, boundary) = match tail.find("introduction") {
        Some(pos) => (start + pos, AbstractBoundary::Introduction),
        None => FALLBACK_MARKERS
            .iter()
            .filter_map(|(marker, boundary)| tail.find(marker).map(|pos| (start + pos, *boundary)))
            .min_by_key(|(pos, _)| *pos)
            .unwrap_or_else(|| {
                (
                    window_end(text, start, ABSTRACT_WINDOW_CHARS),
                    AbstractBoundary::Window,
                )
            }),
    };

    let span = text[start..end].trim();
    let body = match span.get(..ABSTRACT_LABEL.len()) {
        Some(label) if label.eq_ignore_ascii_case(ABSTRACT_LABEL) => {
            span[ABSTRACT_LABEL.len()..].trim()
        }
        _ => span,
    };

    let mut sections = Sections::default();
    sections
        .sections
        .insert(SECTION_ABSTRACT.to_string(), body.to_string());
    sections.abstract_boundary = Some(boundary);
    sections
}

/// First non-blank line, trimmed.
pub fn title_from_first_page(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Split an Info `/Author` value on commas.
pub fn split_authors(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// `D:YYYYMMDDHHmmSS...` → `YYYY-MM-DD`. The `D:` prefix is optional and
/// anything past the day is ignored.
pub fn format_pdf_date(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches("D:");
    let ymd = digits.get(..8)?;
    if !ymd.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = ymd[..4].parse().ok()?;
    let month: u32 = ymd[4..6].parse().ok()?;
    let day: u32 = ymd[6..8].parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Decode a PDF text string: UTF-16BE when it starts with the `FE FF` byte
/// order mark, otherwise one byte per character.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

// ── Document helpers ─────────────────────────────────────────────────────────

fn load(path: &Path) -> Result<Document> {
    Document::load(path).with_context(|| format!("failed to parse PDF {}", path.display()))
}

fn metadata_from_document(doc: &Document, path: &Path) -> PaperMetadata {
    let info = info_dictionary(doc);
    let info_string = |key: &[u8]| info.and_then(|dict| dict_string(doc, dict, key));

    let (title, title_source) = match info_string(b"Title").filter(|t| !t.trim().is_empty()) {
        Some(title) => (title.trim().to_string(), TitleSource::Metadata),
        None => match first_page_text(doc).as_deref().and_then(title_from_first_page) {
            Some(line) => (line, TitleSource::FirstLine),
            None => (file_stem(path), TitleSource::FileStem),
        },
    };

    PaperMetadata {
        title,
        authors: info_string(b"Author")
            .map(|a| split_authors(&a))
            .unwrap_or_default(),
        publication_date: info_string(b"CreationDate").and_then(|d| format_pdf_date(&d)),
        abstract_text: None,
        keywords: Vec::new(),
        doi: None,
        source_file: path.to_path_buf(),
        title_source,
    }
}

fn text_from_document(doc: &Document) -> String {
    let mut text = String::new();
    for page_number in doc.get_pages().keys() {
        text.push_str(&page_text(doc, *page_number));
        text.push_str("\n\n");
    }
    text
}

fn first_page_text(doc: &Document) -> Option<String> {
    let first = *doc.get_pages().keys().next()?;
    Some(page_text(doc, first))
}

/// Text of one page. A page lopdf cannot decode contributes nothing.
fn page_text(doc: &Document, page_number: u32) -> String {
    match doc.extract_text(&[page_number]) {
        Ok(text) => text,
        Err(e) => {
            warn!(page = page_number, error = %e, "Could not extract page text");
            String::new()
        }
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn dict_string(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let object = match dict.get(key).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn window_end(text: &str, start: usize, chars: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(chars)
        .map(|(offset, _)| start + offset)
        .unwrap_or(text.len())
}
