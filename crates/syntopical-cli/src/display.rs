//! Terminal rendering.

use console::style;
use syntopical_chat::SourceDocument;
use syntopical_db::{DatabaseStats, PaperRecord};
use syntopical_ingestion::IngestionReport;

pub fn paper_table(papers: &[PaperRecord], stats: &DatabaseStats) {
    if papers.is_empty() {
        println!("{}", style("No papers indexed yet. Try `syntopical upload <pdf>`.").yellow());
        return;
    }

    println!(
        "{:<50}  {:<30}  {:<10}  {:>6}",
        style("Title").bold(),
        style("Authors").bold(),
        style("Date").bold(),
        style("Chunks").bold()
    );
    for paper in papers {
        println!(
            "{:<50}  {:<30}  {:<10}  {:>6}",
            truncate(&paper.title, 50),
            truncate(&paper.authors, 30),
            paper.publication_date.as_deref().unwrap_or("-"),
            paper.chunk_count
        );
    }
    println!("\n{} paper(s), {} chunk(s)", stats.papers, stats.chunks);
}

pub fn answer(text: &str) {
    println!("\n{}\n{}", style("Answer").cyan().bold(), text.trim());
}

/// The first `limit` sources, closest first.
pub fn sources(docs: &[SourceDocument], limit: usize) {
    if docs.is_empty() {
        return;
    }
    println!("\n{}", style("Sources").dim());
    for (i, doc) in docs.iter().take(limit).enumerate() {
        let date = doc.publication_date.as_deref().unwrap_or("n.d.");
        println!(
            "  {}. {} {}",
            i + 1,
            style(&doc.title).bold(),
            style(format!("({}, {date})", doc.authors)).dim()
        );
    }
}

pub fn ingestion_summary(report: &IngestionReport) {
    println!(
        "Indexed {} of {} paper(s), {} chunk(s) in {:.1}s",
        style(report.papers_indexed()).green().bold(),
        report.papers_found,
        report.chunks_inserted,
        report.duration_ms as f64 / 1000.0
    );
    if !report.errors.is_empty() {
        println!("{}", style(format!("{} file(s) failed", report.errors.len())).red());
    }
}

pub fn error(msg: impl std::fmt::Display) {
    eprintln!("{} {msg}", style("error:").red().bold());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
