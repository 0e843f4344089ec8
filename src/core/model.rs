// corpusboard - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Collector
// =============================================================================

/// A data-source connector that feeds documents into the corpus.
///
/// Collection is simulated; the status field drives what the dashboard shows
/// and which start/stop actions are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collector {
    /// Unique display name (e.g. "arXiv").
    pub name: String,

    /// Kind of source the collector reads from.
    #[serde(rename = "type")]
    pub source_type: SourceType,

    /// Current lifecycle state.
    pub status: CollectorStatus,

    /// Date of the last completed run, if any.
    pub last_run: Option<NaiveDate>,

    /// Documents collected so far.
    pub documents: u64,

    /// Progress of the current run in percent. Zero when not running.
    #[serde(default)]
    pub progress: u8,
}

/// Kind of source a collector reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Documentation,
    Books,
    Code,
    Research,
    Papers,
    #[serde(rename = "Economic Data", alias = "EconomicData")]
    EconomicData,
    #[serde(rename = "Market Data", alias = "MarketData")]
    MarketData,
    Academic,
    General,
}

impl SourceType {
    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Documentation => "Documentation",
            SourceType::Books => "Books",
            SourceType::Code => "Code",
            SourceType::Research => "Research",
            SourceType::Papers => "Papers",
            SourceType::EconomicData => "Economic Data",
            SourceType::MarketData => "Market Data",
            SourceType::Academic => "Academic",
            SourceType::General => "General",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Collector lifecycle state.
///
/// `idle -> running -> idle` via start/stop. `error` is only entered from
/// `running` on an external failure signal. `stopped` is an explicit user
/// stop that otherwise behaves like `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollectorStatus {
    #[default]
    Idle,
    Running,
    Stopped,
    Error,
}

impl CollectorStatus {
    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            CollectorStatus::Idle => "Idle",
            CollectorStatus::Running => "Running",
            CollectorStatus::Stopped => "Stopped",
            CollectorStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for CollectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Domain
// =============================================================================

/// A named topic category with a target share of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Unique display name (e.g. "DeFi").
    pub name: String,

    /// Desired share of the corpus, in [0, 1].
    #[serde(alias = "allocation")]
    pub target_allocation: f64,

    /// Observed share of the corpus, in [0, 1].
    #[serde(alias = "current")]
    pub current_allocation: f64,

    /// Documents classified into this domain.
    pub documents: u64,

    /// Mean quality score of those documents, in [0, 1].
    pub quality: f64,

    /// Documents scoring below this are flagged, in [0, 1].
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,

    /// Terms that mark a document as belonging here. Trimmed, non-empty
    /// and unique ignoring case.
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_min_quality() -> f64 {
    constants::DEFAULT_MIN_QUALITY
}

// =============================================================================
// Document catalogue
// =============================================================================

/// A document held in the corpus, as listed by the corpus manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Unique title.
    pub title: String,

    /// Name of the domain the document is filed under.
    pub domain: String,

    #[serde(rename = "type")]
    pub kind: DocumentKind,

    /// Date the document was added.
    pub date: NaiveDate,

    pub size_mb: f64,

    /// Quality score, in [0, 1].
    pub quality: f64,

    /// Abstract or summary.
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "PDF", alias = "Pdf")]
    Pdf,
    Research,
    Code,
}

impl DocumentKind {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Research => "Research",
            DocumentKind::Code => "Code",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Processing queue
// =============================================================================

/// A file waiting for (or undergoing) text extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique file name.
    pub file: String,

    /// Which processor handles the file.
    pub lane: QueueLane,

    /// Current processing state.
    pub status: QueueStatus,

    /// Extraction progress in percent. Never decreases.
    pub progress: u8,
}

/// Processor lane. PDFs and everything else are extracted by separate
/// processors with different pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueLane {
    Pdf,
    #[serde(alias = "non-pdf")]
    NonPdf,
}

impl QueueLane {
    /// Returns all variants in display order.
    pub fn all() -> &'static [QueueLane] {
        &[QueueLane::Pdf, QueueLane::NonPdf]
    }

    /// Lane a file lands in when none is given explicitly.
    pub fn for_file(file: &str) -> Self {
        if file.to_lowercase().ends_with(".pdf") {
            QueueLane::Pdf
        } else {
            QueueLane::NonPdf
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            QueueLane::Pdf => "PDF",
            QueueLane::NonPdf => "Non-PDF",
        }
    }
}

impl std::fmt::Display for QueueLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Queue item state. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Queued,
    Processing,
    Completed,
}

impl QueueStatus {
    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "queued",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Activity log
// =============================================================================

/// One line of the append-only activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Monotonically increasing ID within the session.
    pub id: u64,

    /// When the action was recorded.
    pub timestamp: DateTime<Utc>,

    /// What happened, e.g. "Started GitHub collection".
    pub action: String,

    /// Outcome class of the action.
    pub status: ActivityStatus,

    /// Optional free-form detail, e.g. "23 papers collected".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Outcome class of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Running,
    Success,
    Info,
    Warning,
    Error,
}

impl ActivityStatus {
    /// Returns all variants in display order.
    pub fn all() -> &'static [ActivityStatus] {
        &[
            ActivityStatus::Running,
            ActivityStatus::Success,
            ActivityStatus::Info,
            ActivityStatus::Warning,
            ActivityStatus::Error,
        ]
    }

    /// Lowercase label, also the serialised form.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityStatus::Running => "running",
            ActivityStatus::Success => "success",
            ActivityStatus::Info => "info",
            ActivityStatus::Warning => "warning",
            ActivityStatus::Error => "error",
        }
    }

    /// Parse a CLI token (case-insensitive).
    pub fn from_token(token: &str) -> Option<Self> {
        let lower = token.to_lowercase();
        Self::all().iter().copied().find(|s| s.label() == lower)
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Change notifications
// =============================================================================

/// Kind of entity a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    Collector,
    Domain,
    QueueItem,
    Activity,
    Document,
}

impl EntityKind {
    /// Lowercase noun used in messages and errors.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Collector => "collector",
            EntityKind::Domain => "domain",
            EntityKind::QueueItem => "queue item",
            EntityKind::Activity => "activity entry",
            EntityKind::Document => "document",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Passed to every subscriber after a mutation.
///
/// `id` is the entity's name (collector, domain), file name (queue item) or
/// decimal entry ID (activity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: EntityKind,
    pub id: String,
}

impl Change {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

// =============================================================================
// Derived statistics
// =============================================================================

/// Corpus-wide figures derived from the current store contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    /// Sum of document counts over all domains.
    pub total_documents: u64,

    /// On-disk corpus size as seeded (not recomputed).
    pub total_size_gb: f64,

    /// Unweighted mean of domain quality scores (0 when there are no domains).
    pub average_quality: f64,

    /// Queue items not yet started.
    pub queued: usize,

    /// Queue items in progress.
    pub processing: usize,

    /// Queue items finished.
    pub completed: usize,

    /// Collectors currently running.
    pub running_collectors: usize,

    /// Time of the most recent mutation (or of seeding).
    pub last_updated: DateTime<Utc>,
}

/// Borrowed, serialisable view of the whole store at one instant.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub stats: CorpusStats,
    pub collectors: &'a [Collector],
    pub domains: &'a [Domain],
    pub queue: &'a [QueueItem],
    pub activity: &'a [ActivityEntry],
    pub documents: &'a [CorpusDocument],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_inferred_from_extension() {
        assert_eq!(QueueLane::for_file("report.PDF"), QueueLane::Pdf);
        assert_eq!(QueueLane::for_file("notes.md"), QueueLane::NonPdf);
        assert_eq!(QueueLane::for_file("pdf"), QueueLane::NonPdf);
    }

    #[test]
    fn test_domain_config_defaults_when_absent() {
        let domain: Domain = toml::from_str(
            "name = \"DeFi\"\nallocation = 0.1\ncurrent = 0.1\ndocuments = 3\nquality = 0.8",
        )
        .unwrap();
        assert_eq!(domain.min_quality, constants::DEFAULT_MIN_QUALITY);
        assert!(domain.keywords.is_empty());
    }

    #[test]
    fn test_document_kind_accepts_upper_and_title_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: DocumentKind,
        }
        let upper: Wrapper = toml::from_str(r#"kind = "PDF""#).unwrap();
        let title: Wrapper = toml::from_str(r#"kind = "Pdf""#).unwrap();
        assert_eq!(upper.kind, DocumentKind::Pdf);
        assert_eq!(title.kind, DocumentKind::Pdf);
        assert_eq!(DocumentKind::Research.to_string(), "Research");
    }

    #[test]
    fn test_source_type_accepts_spaced_and_compact_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: SourceType,
        }
        let spaced: Wrapper = toml::from_str(r#"kind = "Economic Data""#).unwrap();
        let compact: Wrapper = toml::from_str(r#"kind = "MarketData""#).unwrap();
        assert_eq!(spaced.kind, SourceType::EconomicData);
        assert_eq!(compact.kind, SourceType::MarketData);
    }

    #[test]
    fn test_status_tokens() {
        assert_eq!(ActivityStatus::from_token("paused"), None);
        assert_eq!(
            ActivityStatus::from_token("Warning"),
            Some(ActivityStatus::Warning)
        );
    }

    #[test]
    fn test_queue_status_orders_forward() {
        assert!(QueueStatus::Queued < QueueStatus::Processing);
        assert!(QueueStatus::Processing < QueueStatus::Completed);
    }
}
