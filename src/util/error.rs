// corpusboard - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every failure names the subsystem
// that produced it and keeps its causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all corpusboard operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum CorpusBoardError {
    /// A store read/update was rejected.
    Store(StoreError),

    /// Seed dataset loading or validation failed.
    Seed(SeedError),

    /// A collection backend refused or failed a request.
    Collection(CollectionError),

    /// Filter operation failed.
    Filter(FilterError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for CorpusBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::Seed(e) => write!(f, "Seed dataset error: {e}"),
            Self::Collection(e) => write!(f, "Collection error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for CorpusBoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Seed(e) => Some(e),
            Self::Collection(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors returned by `ViewStateStore` operations.
///
/// Both variants are local and non-fatal: a failed operation never leaves
/// the store partially updated.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No entity of `kind` is named `name`.
    NotFound { kind: &'static str, name: String },

    /// A numeric or textual input is outside its allowed range.
    Validation {
        field: &'static str,
        value: String,
        expected: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, name } => write!(f, "Unknown {kind} '{name}'"),
            Self::Validation {
                field,
                value,
                expected,
            } => write!(f, "Invalid {field} '{value}'. Expected: {expected}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for CorpusBoardError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Seed errors
// ---------------------------------------------------------------------------

/// Errors related to loading and validating a seed dataset.
#[derive(Debug)]
pub enum SeedError {
    /// TOML could not be parsed into the dataset shape.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Dataset file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Two entities of the same kind share a name.
    DuplicateName { kind: &'static str, name: String },

    /// A numeric field is outside its allowed range.
    OutOfRange {
        kind: &'static str,
        name: String,
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// Fields of one entity contradict each other (e.g. a completed item
    /// below 100 %).
    Inconsistent {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// More entities of one kind than the dataset limit allows.
    TooManyEntities {
        kind: &'static str,
        count: usize,
        max: usize,
    },

    /// I/O error reading the dataset file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Dataset '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::DuplicateName { kind, name } => {
                write!(f, "Duplicate {kind} name '{name}'")
            }
            Self::OutOfRange {
                kind,
                name,
                field,
                value,
                expected,
            } => write!(
                f,
                "{kind} '{name}': {field} = {value} is out of range. Expected: {expected}"
            ),
            Self::Inconsistent { kind, name, reason } => {
                write!(f, "{kind} '{name}': {reason}")
            }
            Self::TooManyEntities { kind, count, max } => {
                write!(f, "Too many {kind} entries ({count}), maximum is {max}")
            }
            Self::Io { path, source } => {
                write!(
                    f,
                    "I/O error reading dataset '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SeedError> for CorpusBoardError {
    fn from(e: SeedError) -> Self {
        Self::Seed(e)
    }
}

// ---------------------------------------------------------------------------
// Collection errors
// ---------------------------------------------------------------------------

/// Errors reported by a `CollectionBackend`.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionError {
    /// The backend already has a collection in flight for this collector.
    AlreadyRunning { collector: String },

    /// The backend cannot reach or drive this collector's source.
    Unavailable { collector: String, reason: String },
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning { collector } => {
                write!(f, "Collector '{collector}' is already collecting")
            }
            Self::Unavailable { collector, reason } => {
                write!(f, "Collector '{collector}' is unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for CollectionError {}

impl From<CollectionError> for CorpusBoardError {
    fn from(e: CollectionError) -> Self {
        Self::Collection(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to filter operations.
#[derive(Debug)]
pub enum FilterError {
    /// User-provided regex is invalid.
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { pattern, source } => {
                write!(f, "Invalid filter regex '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
        }
    }
}

impl From<FilterError> for CorpusBoardError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for CorpusBoardError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for CorpusBoardError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for corpusboard results.
pub type Result<T> = std::result::Result<T, CorpusBoardError>;
