// corpusboard - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every tunable that config.toml can override is bounded here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "CorpusBoard";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "CorpusBoard";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Entity value bounds
// =============================================================================

/// Upper bound of every progress percentage (collectors and queue items).
pub const MAX_PROGRESS: u8 = 100;

/// Lower bound of every allocation / quality fraction.
pub const MIN_FRACTION: f64 = 0.0;

/// Upper bound of every allocation / quality fraction.
pub const MAX_FRACTION: f64 = 1.0;

// =============================================================================
// Seed dataset limits
// =============================================================================

/// Maximum size of a user-supplied seed dataset file in bytes.
pub const MAX_SEED_FILE_SIZE: u64 = 256 * 1024; // 256 KB

/// Maximum number of entities of any one kind in a seed dataset.
pub const MAX_SEED_ENTITIES: usize = 1_000;

// =============================================================================
// Document catalogue
// =============================================================================

/// Directory documents are filed under when a dataset names none.
pub const DEFAULT_CORPUS_ROOT: &str = "G:/corpus";

/// Extension of every stored document.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Quality threshold for domains that do not set one.
pub const DEFAULT_MIN_QUALITY: f64 = 0.75;

/// Maximum number of keywords a domain may carry.
pub const MAX_DOMAIN_KEYWORDS: usize = 64;

// =============================================================================
// Balancer
// =============================================================================

/// Default band (as a fraction) within which current allocation counts as
/// matching the target.
pub const DEFAULT_BALANCE_TOLERANCE: f64 = 0.01;

/// Minimum configurable balance tolerance.
pub const MIN_BALANCE_TOLERANCE: f64 = 0.0;

/// Maximum configurable balance tolerance. Beyond 25 % every domain looks
/// balanced and the rebalance plan is always empty.
pub const MAX_BALANCE_TOLERANCE: f64 = 0.25;

// =============================================================================
// Simulation timing (demo-only progress animation)
// =============================================================================

/// Delay between starting a collector and its first progress report (ms).
pub const DEFAULT_COLLECTOR_CONNECT_DELAY_MS: u64 = 500;

/// Interval between simulated collector progress reports (ms).
pub const DEFAULT_COLLECTOR_TICK_MS: u64 = 1_000;

/// Progress percentage reported when a simulated collector connects.
pub const COLLECTOR_CONNECT_PROGRESS: u8 = 5;

/// Progress added per simulated collector tick (percentage points).
pub const DEFAULT_COLLECTOR_STEP: u8 = 5;

/// Documents a simulated collection reports on completion.
pub const DEFAULT_SIMULATED_DOCUMENTS: u64 = 25;

/// Interval between PDF queue ticks (ms).
pub const DEFAULT_PDF_TICK_MS: u64 = 1_000;

/// Progress added per PDF queue tick (percentage points).
pub const DEFAULT_PDF_STEP: u8 = 5;

/// Interval between non-PDF queue ticks (ms).
pub const DEFAULT_NONPDF_TICK_MS: u64 = 800;

/// Progress added per non-PDF queue tick (percentage points).
pub const DEFAULT_NONPDF_STEP: u8 = 10;

/// Delay before a batch operation reports completion (ms).
pub const DEFAULT_BATCH_DELAY_MS: u64 = 3_000;

/// Delay before a corpus rebalance is applied (ms).
pub const DEFAULT_REBALANCE_DELAY_MS: u64 = 5_000;

/// Minimum user-configurable tick / delay (ms).
pub const MIN_SIMULATION_INTERVAL_MS: u64 = 1;

/// Maximum user-configurable tick / delay (ms).
pub const MAX_SIMULATION_INTERVAL_MS: u64 = 60_000; // 60 s

/// Minimum user-configurable progress step.
pub const MIN_PROGRESS_STEP: u8 = 1;

/// How often a sleeping scheduler thread checks its cancel flag (ms).
/// Bounds the time between `TaskHandle::cancel` and thread exit.
pub const CANCEL_CHECK_INTERVAL_MS: u64 = 25;

// =============================================================================
// Event pump budgets
// =============================================================================

/// Maximum number of scheduler events applied per `Dashboard::pump` call.
/// Remaining events stay queued for the next pump.
pub const MAX_EVENTS_PER_PUMP: usize = 500;

/// Maximum number of undelivered user notices kept by the dashboard.
/// Oldest notices are dropped first.
pub const MAX_PENDING_NOTICES: usize = 200;

/// Default number of activity entries shown by the CLI.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;

/// Default time the `demo` command waits for simulated work (seconds).
pub const DEFAULT_DEMO_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
