//! arXiv API client.
//!
//! Endpoints used:
//!   query: http://export.arxiv.org/api/query  (Atom feed)
//!   pdf:   the `rel="related" title="pdf"` link of each entry

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use syntopical_common::sandbox::SandboxClient as Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "http://export.arxiv.org";

const DOWNLOAD_BUFFER_BYTES: usize = 8 * 1024;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArxivPaper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    /// `YYYY-MM-DD`
    pub published: String,
    pub pdf_url: String,
    /// Abstract page URL, e.g. `http://arxiv.org/abs/2101.00001v1`.
    pub entry_id: String,
    /// Short id with version, e.g. `2101.00001v1` or `hep-th/9901001v2`.
    pub arxiv_id: String,
    pub categories: Vec<String>,
}

impl ArxivPaper {
    /// File name used in the download directory. Old-style ids contain a
    /// slash, which is replaced so the file lands directly in the directory.
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.arxiv_id.replace('/', "_"))
    }
}

pub struct ArxivClient {
    client: Client,
    base_url: String,
    download_dir: PathBuf,
}

impl ArxivClient {
    /// Create a client that saves PDFs into `download_dir`, creating it if
    /// needed.
    pub fn new(download_dir: impl Into<PathBuf>) -> Result<Self> {
        let download_dir = download_dir.into();
        std::fs::create_dir_all(&download_dir).with_context(|| {
            format!("cannot create download directory {}", download_dir.display())
        })?;
        Ok(Self {
            client: Client::new()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            download_dir,
        })
    }

    /// Point the client at another API host (a mirror, or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        self.client.allow_url(&base_url);
        self.base_url = base_url;
        self
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Search arXiv, most relevant first. Plain text searches all fields;
    /// field queries like `ti:rag AND au:lewis` are sent as written.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArxivPaper>> {
        let url = format!("{}/api/query", self.base_url);
        let search_query = search_query(query);
        let max_results = max_results.to_string();

        let xml = self
            .client
            .get(&url)?
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .with_context(|| format!("arXiv API unreachable at {url}"))?
            .error_for_status()?
            .text()
            .await?;

        let papers = parse_atom_feed(&xml)?;
        debug!(n = papers.len(), "arXiv search returned");
        Ok(papers)
    }

    /// Download a paper's PDF unless it is already on disk.
    #[instrument(skip(self, paper), fields(arxiv_id = %paper.arxiv_id))]
    pub async fn download_paper(&self, paper: &ArxivPaper) -> Result<PathBuf> {
        let target = self.download_dir.join(paper.file_name());
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            debug!(path = %target.display(), "PDF already downloaded");
            return Ok(target);
        }

        let part = target.with_extension("pdf.part");
        if let Err(e) = self.fetch_to(&paper.pdf_url, &part).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
        tokio::fs::rename(&part, &target).await?;

        info!(path = %target.display(), "Downloaded PDF");
        Ok(target)
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<()> {
        let mut resp = self
            .client
            .get(url)?
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("download failed for {url}"))?;

        let file = tokio::fs::File::create(path).await?;
        let mut out = tokio::io::BufWriter::with_capacity(DOWNLOAD_BUFFER_BYTES, file);
        while let Some(chunk) = resp.chunk().await? {
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        Ok(())
    }

    /// Search, then download each hit. A failed download is logged and the
    /// hit dropped; only a failed search is an error.
    pub async fn search_and_download(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<(ArxivPaper, PathBuf)>> {
        let papers = self.search(query, max_results).await?;
        let mut downloaded = Vec::with_capacity(papers.len());
        for paper in papers {
            match self.download_paper(&paper).await {
                Ok(path) => downloaded.push((paper, path)),
                Err(e) => warn!(title = %paper.title, error = %e, "Skipping paper, download failed"),
            }
        }
        Ok(downloaded)
    }
}

/// arXiv API field prefixes.
const FIELD_PREFIXES: [&str; 9] = ["ti", "au", "abs", "co", "jr", "cat", "rn", "id", "all"];

fn search_query(query: &str) -> String {
    let query = query.trim();
    let has_field = query
        .split(|c: char| c.is_whitespace() || c == '(')
        .filter_map(|token| token.split_once(':'))
        .any(|(field, _)| FIELD_PREFIXES.contains(&field));
    if has_field {
        query.to_string()
    } else {
        format!("all:{query}")
    }
}

// ── Atom parsing ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

/// Parse an arXiv Atom feed, keeping entries in feed order.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<ArxivPaper>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut current: Option<ArxivPaper> = None;
    let mut field = Field::None;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                match e.name().as_ref() {
                    b"entry" => current = Some(empty_paper()),
                    b"author" => in_author = true,
                    b"link" | b"category" => {
                        if let Some(p) = current.as_mut() {
                            apply_empty_element(p, e);
                        }
                    }
                    name if current.is_some() => {
                        field = match name {
                            b"id" => Field::Id,
                            b"title" => Field::Title,
                            b"summary" => Field::Summary,
                            b"published" => Field::Published,
                            b"name" if in_author => Field::AuthorName,
                            _ => Field::None,
                        };
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                if let Some(p) = current.as_mut() {
                    apply_empty_element(p, e);
                }
            }
            Ok(Event::Text(ref e)) => {
                if field != Field::None {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::CData(ref e)) => {
                if field != Field::None {
                    text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"entry" => {
                    if let Some(mut p) = current.take() {
                        finish_paper(&mut p);
                        if p.title.is_empty() {
                            warn!("Skipping arXiv entry with empty title");
                        } else {
                            papers.push(p);
                        }
                    }
                }
                b"author" => in_author = false,
                _ => {
                    if let Some(p) = current.as_mut() {
                        let value = text.trim();
                        match field {
                            Field::Id => p.entry_id = value.to_string(),
                            Field::Title => p.title = collapse_whitespace(value),
                            Field::Summary => p.summary = value.to_string(),
                            Field::Published => {
                                p.published = value.get(..10).unwrap_or(value).to_string()
                            }
                            Field::AuthorName => p.authors.push(collapse_whitespace(value)),
                            Field::None => {}
                        }
                    }
                    field = Field::None;
                    text.clear();
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "malformed arXiv feed at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }

    Ok(papers)
}

fn empty_paper() -> ArxivPaper {
    ArxivPaper {
        title: String::new(),
        authors: Vec::new(),
        summary: String::new(),
        published: String::new(),
        pdf_url: String::new(),
        entry_id: String::new(),
        arxiv_id: String::new(),
        categories: Vec::new(),
    }
}

/// `<link>` and `<category>` carry their data in attributes.
fn apply_empty_element(paper: &mut ArxivPaper, e: &BytesStart<'_>) {
    let attr = |key: &[u8]| {
        e.attributes()
            .flatten()
            .find(|a| a.key.as_ref() == key)
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
    };

    match e.name().as_ref() {
        b"link" => {
            let is_pdf = attr(b"title").as_deref() == Some("pdf")
                || attr(b"type").as_deref() == Some("application/pdf");
            if is_pdf {
                if let Some(href) = attr(b"href") {
                    paper.pdf_url = href;
                }
            }
        }
        b"category" => {
            if let Some(term) = attr(b"term") {
                if !paper.categories.contains(&term) {
                    paper.categories.push(term);
                }
            }
        }
        _ => {}
    }
}

fn finish_paper(paper: &mut ArxivPaper) {
    paper.arxiv_id = short_id(&paper.entry_id);
    if paper.pdf_url.is_empty() && !paper.entry_id.is_empty() {
        paper.pdf_url = paper.entry_id.replacen("/abs/", "/pdf/", 1);
    }
}

/// `http://arxiv.org/abs/2101.00001v1` → `2101.00001v1`.
fn short_id(entry_id: &str) -> String {
    match entry_id.split_once("arxiv.org/abs/") {
        Some((_, id)) => id.to_string(),
        None => entry_id.rsplit('/').next().unwrap_or(entry_id).to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
