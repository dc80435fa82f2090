//! Data models for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Section key under which the detected abstract is stored.
pub const SECTION_ABSTRACT: &str = "abstract";

/// Bibliographic information extracted from a PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    pub authors: Vec<String>,
    /// `YYYY-MM-DD`, from the document's creation date.
    pub publication_date: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub doi: Option<String>,
    pub source_file: PathBuf,
    /// Where the title came from.
    pub title_source: TitleSource,
}

impl PaperMetadata {
    /// Authors as stored on chunk rows.
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

/// Which rule produced [`PaperMetadata::title`], from most to least reliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    /// The document Info dictionary's `/Title`.
    Metadata,
    /// First non-blank line of page one.
    FirstLine,
    /// File name without extension.
    FileStem,
}

/// Which marker closed the detected abstract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractBoundary {
    Introduction,
    Keywords,
    NumberedHeading,
    RomanHeading,
    Background,
    /// No marker found; a fixed-length window was taken.
    Window,
}

/// Sections detected in a paper's text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub sections: BTreeMap<String, String>,
    /// Set whenever an abstract was found.
    pub abstract_boundary: Option<AbstractBoundary>,
}

impl Sections {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }
}

/// A processed paper: metadata, full text and detected sections.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperContent {
    pub metadata: PaperMetadata,
    pub text: String,
    pub sections: BTreeMap<String, String>,
    pub abstract_boundary: Option<AbstractBoundary>,
}
