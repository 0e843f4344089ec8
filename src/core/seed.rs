// corpusboard - core/seed.rs
//
// Seed dataset parsing and validation.
// Core layer: accepts TOML strings, never touches the filesystem.
// File I/O is handled by app::dataset which feeds content here.

use crate::core::corpus;
use crate::core::model::{
    ActivityStatus, Collector, CollectorStatus, CorpusDocument, Domain, EntityKind, QueueItem,
    QueueLane, QueueStatus,
};
use crate::util::constants;
use crate::util::error::SeedError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The built-in dataset, embedded at compile time.
const BUILTIN_DATASET: &str = include_str!("../../seed/default.toml");

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw dataset as deserialized from TOML.
/// Validated into a `Dataset` before the store sees it.
#[derive(Debug, Deserialize)]
struct RawDataset {
    #[serde(default)]
    corpus: CorpusSection,
    #[serde(default)]
    collectors: Vec<Collector>,
    #[serde(default)]
    domains: Vec<Domain>,
    #[serde(default)]
    queue: Vec<RawQueueItem>,
    #[serde(default)]
    activity: Vec<SeedActivity>,
    #[serde(default)]
    documents: Vec<CorpusDocument>,
}

/// `[corpus]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorpusSection {
    /// On-disk corpus size in GB, shown as-is.
    pub total_size_gb: f64,

    /// Directory documents are filed under.
    pub root: String,
}

impl Default for CorpusSection {
    fn default() -> Self {
        Self {
            total_size_gb: 0.0,
            root: constants::DEFAULT_CORPUS_ROOT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQueueItem {
    file: String,
    lane: Option<QueueLane>,
    status: QueueStatus,
    #[serde(default)]
    progress: u8,
}

/// An activity entry as written in a dataset. IDs are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedActivity {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub status: ActivityStatus,
    #[serde(default)]
    pub details: Option<String>,
}

/// A validated dataset, ready to seed a `ViewStateStore`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub corpus: CorpusSection,
    pub collectors: Vec<Collector>,
    pub domains: Vec<Domain>,
    pub queue: Vec<QueueItem>,
    /// Newest first, as displayed.
    pub activity: Vec<SeedActivity>,
    pub documents: Vec<CorpusDocument>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse and validate a dataset from TOML text.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_dataset(content: &str, source_path: &Path) -> Result<Dataset, SeedError> {
    let raw: RawDataset = toml::from_str(content).map_err(|e| SeedError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })?;

    let queue = raw
        .queue
        .into_iter()
        .map(|item| QueueItem {
            lane: item.lane.unwrap_or_else(|| QueueLane::for_file(&item.file)),
            file: item.file,
            status: item.status,
            progress: item.progress,
        })
        .collect();

    let mut domains = raw.domains;
    for domain in &mut domains {
        domain.keywords = corpus::normalise_keywords(&domain.keywords);
    }

    let dataset = Dataset {
        corpus: raw.corpus,
        collectors: raw.collectors,
        domains,
        queue,
        activity: raw.activity,
        documents: raw.documents,
    };

    validate(&dataset)?;

    tracing::debug!(
        path = %source_path.display(),
        collectors = dataset.collectors.len(),
        domains = dataset.domains.len(),
        queue = dataset.queue.len(),
        activity = dataset.activity.len(),
        documents = dataset.documents.len(),
        "Parsed seed dataset"
    );

    Ok(dataset)
}

/// Parse the dataset embedded in the binary.
///
/// A failure here is a packaging bug; the caller decides whether to abort.
pub fn load_builtin() -> Result<Dataset, SeedError> {
    parse_dataset(BUILTIN_DATASET, &PathBuf::from("<builtin>/default.toml"))
}

// =============================================================================
// Validation
// =============================================================================

fn validate(dataset: &Dataset) -> Result<(), SeedError> {
    check_count(EntityKind::Collector, dataset.collectors.len())?;
    check_count(EntityKind::Domain, dataset.domains.len())?;
    check_count(EntityKind::QueueItem, dataset.queue.len())?;
    check_count(EntityKind::Activity, dataset.activity.len())?;
    check_count(EntityKind::Document, dataset.documents.len())?;

    check_unique(
        EntityKind::Collector,
        dataset.collectors.iter().map(|c| c.name.as_str()),
    )?;
    check_unique(
        EntityKind::Domain,
        dataset.domains.iter().map(|d| d.name.as_str()),
    )?;
    check_unique(
        EntityKind::QueueItem,
        dataset.queue.iter().map(|q| q.file.as_str()),
    )?;
    check_unique(
        EntityKind::Document,
        dataset.documents.iter().map(|d| d.title.as_str()),
    )?;

    for collector in &dataset.collectors {
        validate_collector(collector)?;
    }
    for domain in &dataset.domains {
        validate_domain(domain)?;
    }
    for item in &dataset.queue {
        validate_queue_item(item)?;
    }
    for document in &dataset.documents {
        validate_document(document, &dataset.domains)?;
    }

    Ok(())
}

fn check_count(kind: EntityKind, count: usize) -> Result<(), SeedError> {
    if count > constants::MAX_SEED_ENTITIES {
        return Err(SeedError::TooManyEntities {
            kind: kind.label(),
            count,
            max: constants::MAX_SEED_ENTITIES,
        });
    }
    Ok(())
}

fn check_unique<'a>(
    kind: EntityKind,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SeedError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(SeedError::Inconsistent {
                kind: kind.label(),
                name: name.to_string(),
                reason: "name must not be empty".to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(SeedError::DuplicateName {
                kind: kind.label(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_collector(collector: &Collector) -> Result<(), SeedError> {
    let kind = EntityKind::Collector.label();
    if collector.progress > constants::MAX_PROGRESS {
        return Err(SeedError::OutOfRange {
            kind,
            name: collector.name.clone(),
            field: "progress",
            value: collector.progress.to_string(),
            expected: "0-100",
        });
    }
    if collector.progress > 0 && collector.status != CollectorStatus::Running {
        return Err(SeedError::Inconsistent {
            kind,
            name: collector.name.clone(),
            reason: format!(
                "progress {} on a collector that is {}",
                collector.progress,
                collector.status.label().to_lowercase()
            ),
        });
    }
    Ok(())
}

fn validate_domain(domain: &Domain) -> Result<(), SeedError> {
    let fields = [
        ("allocation", domain.target_allocation),
        ("current", domain.current_allocation),
        ("quality", domain.quality),
        ("min_quality", domain.min_quality),
    ];
    for (field, value) in fields {
        if !is_fraction(value) {
            return Err(SeedError::OutOfRange {
                kind: EntityKind::Domain.label(),
                name: domain.name.clone(),
                field,
                value: value.to_string(),
                expected: "0.0-1.0",
            });
        }
    }
    if domain.keywords.len() > constants::MAX_DOMAIN_KEYWORDS {
        return Err(SeedError::OutOfRange {
            kind: EntityKind::Domain.label(),
            name: domain.name.clone(),
            field: "keywords",
            value: domain.keywords.len().to_string(),
            expected: "at most 64 keywords",
        });
    }
    Ok(())
}

fn validate_document(document: &CorpusDocument, domains: &[Domain]) -> Result<(), SeedError> {
    let kind = EntityKind::Document.label();
    if !is_fraction(document.quality) {
        return Err(SeedError::OutOfRange {
            kind,
            name: document.title.clone(),
            field: "quality",
            value: document.quality.to_string(),
            expected: "0.0-1.0",
        });
    }
    if !(document.size_mb.is_finite() && document.size_mb >= 0.0) {
        return Err(SeedError::OutOfRange {
            kind,
            name: document.title.clone(),
            field: "size_mb",
            value: document.size_mb.to_string(),
            expected: "a non-negative size",
        });
    }
    if !domains.iter().any(|d| d.name == document.domain) {
        return Err(SeedError::Inconsistent {
            kind,
            name: document.title.clone(),
            reason: format!("filed under unknown domain '{}'", document.domain),
        });
    }
    Ok(())
}

fn validate_queue_item(item: &QueueItem) -> Result<(), SeedError> {
    let kind = EntityKind::QueueItem.label();
    if item.progress > constants::MAX_PROGRESS {
        return Err(SeedError::OutOfRange {
            kind,
            name: item.file.clone(),
            field: "progress",
            value: item.progress.to_string(),
            expected: "0-100",
        });
    }

    let reason = match item.status {
        QueueStatus::Queued if item.progress != 0 => Some("queued items must be at 0%"),
        QueueStatus::Processing if item.progress == constants::MAX_PROGRESS => {
            Some("an item at 100% must be completed")
        }
        QueueStatus::Completed if item.progress != constants::MAX_PROGRESS => {
            Some("completed items must be at 100%")
        }
        _ => None,
    };

    match reason {
        Some(reason) => Err(SeedError::Inconsistent {
            kind,
            name: item.file.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// True for finite values in [0, 1].
pub fn is_fraction(value: f64) -> bool {
    (constants::MIN_FRACTION..=constants::MAX_FRACTION).contains(&value)
}

// =============================================================================
// Tests
// =============================================================================
