// corpusboard - core/corpus.rs
//
// Document catalogue queries: listing by domain, title lookup, storage
// paths and quality checks against each domain's configuration.
// Core layer: pure logic, no I/O dependencies.

use crate::core::model::{CorpusDocument, Domain};
use crate::util::constants;
use std::collections::HashSet;

/// Documents filed under `domain`, in catalogue order. `None` lists all.
pub fn documents_in<'a>(
    documents: &'a [CorpusDocument],
    domain: Option<&str>,
) -> Vec<&'a CorpusDocument> {
    documents
        .iter()
        .filter(|d| domain.map_or(true, |name| d.domain == name))
        .collect()
}

/// Look a document up by title. An exact match wins over one that differs
/// only in case.
pub fn find_document<'a>(
    documents: &'a [CorpusDocument],
    title: &str,
) -> Option<&'a CorpusDocument> {
    documents
        .iter()
        .find(|d| d.title == title)
        .or_else(|| documents.iter().find(|d| d.title.eq_ignore_ascii_case(title)))
}

/// Lowercase `name` with spaces turned into underscores.
pub fn path_segment(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Where a document lives on disk: `<root>/<domain>/<title>.pdf`.
pub fn storage_path(root: &str, document: &CorpusDocument) -> String {
    format!(
        "{}/{}/{}.{}",
        root.trim_end_matches(['/', '\\']),
        path_segment(&document.domain),
        path_segment(&document.title),
        constants::DOCUMENT_EXTENSION
    )
}

/// Documents scoring below their domain's minimum quality.
pub fn below_threshold<'a>(
    documents: &'a [CorpusDocument],
    domains: &[Domain],
) -> Vec<&'a CorpusDocument> {
    documents
        .iter()
        .filter(|doc| {
            domains
                .iter()
                .find(|d| d.name == doc.domain)
                .is_some_and(|d| doc.quality < d.min_quality)
        })
        .collect()
}

/// Keywords found in the document's title or snippet (case-insensitive).
pub fn keyword_hits<'a>(document: &CorpusDocument, keywords: &'a [String]) -> Vec<&'a str> {
    let haystack = format!("{} {}", document.title, document.snippet).to_lowercase();
    keywords
        .iter()
        .filter(|k| haystack.contains(&k.to_lowercase()))
        .map(String::as_str)
        .collect()
}

/// Trim keywords, drop blanks and drop repeats that differ only in case.
/// The first spelling is kept.
pub fn normalise_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Split a comma-separated keyword list.
pub fn parse_keywords(list: &str) -> Vec<String> {
    let raw: Vec<String> = list.split(',').map(str::to_string).collect();
    normalise_keywords(&raw)
}
