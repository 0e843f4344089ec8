// corpusboard - platform/config.rs
//
// Configuration directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Resolved platform paths for corpusboard configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/corpusboard/ or %APPDATA%\CorpusBoard\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Full path of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still loads
/// with an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[simulation]` section.
    pub simulation: SimulationSection,
    /// `[balancer]` section.
    pub balancer: BalancerSection,
    /// `[seed]` section.
    pub seed: SeedSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[simulation]` config section. Intervals are in milliseconds.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub collector_connect_delay_ms: Option<u64>,
    pub collector_tick_ms: Option<u64>,
    pub collector_step: Option<u8>,
    pub collector_documents: Option<u64>,
    pub pdf_tick_ms: Option<u64>,
    pub pdf_step: Option<u8>,
    pub nonpdf_tick_ms: Option<u64>,
    pub nonpdf_step: Option<u8>,
    pub batch_delay_ms: Option<u64>,
    pub rebalance_delay_ms: Option<u64>,
}

/// `[balancer]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct BalancerSection {
    /// Half-width of the "balanced" band, as a fraction.
    pub tolerance: Option<f64>,
}

/// `[seed]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SeedSection {
    /// Dataset file used instead of the built-in one.
    /// Relative paths are resolved against the config file's directory.
    pub file: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Simulation --
    pub collector_connect_delay_ms: u64,
    pub collector_tick_ms: u64,
    pub collector_step: u8,
    pub collector_documents: u64,
    pub pdf_tick_ms: u64,
    pub pdf_step: u8,
    pub nonpdf_tick_ms: u64,
    pub nonpdf_step: u8,
    pub batch_delay_ms: u64,
    pub rebalance_delay_ms: u64,

    // -- Balancer --
    pub balance_tolerance: f64,

    // -- Seed --
    /// Dataset file to load instead of the built-in one.
    pub seed_file: Option<PathBuf>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collector_connect_delay_ms: constants::DEFAULT_COLLECTOR_CONNECT_DELAY_MS,
            collector_tick_ms: constants::DEFAULT_COLLECTOR_TICK_MS,
            collector_step: constants::DEFAULT_COLLECTOR_STEP,
            collector_documents: constants::DEFAULT_SIMULATED_DOCUMENTS,
            pdf_tick_ms: constants::DEFAULT_PDF_TICK_MS,
            pdf_step: constants::DEFAULT_PDF_STEP,
            nonpdf_tick_ms: constants::DEFAULT_NONPDF_TICK_MS,
            nonpdf_step: constants::DEFAULT_NONPDF_STEP,
            batch_delay_ms: constants::DEFAULT_BATCH_DELAY_MS,
            rebalance_delay_ms: constants::DEFAULT_REBALANCE_DELAY_MS,
            balance_tolerance: constants::DEFAULT_BALANCE_TOLERANCE,
            seed_file: None,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unreadable or unparseable, returns defaults with a warning:
/// the application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match load_config_file(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            let msg = format!(
                "{e}. Using defaults. See config.example.toml for the expected format."
            );
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Load and validate an explicitly named config file.
///
/// Unlike `load_config`, a missing or malformed file is an error.
pub fn load_config_file(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), "Loaded config file");
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(validate(raw, base_dir))
}

/// Parse config text with no file behind it. Relative seed paths are kept
/// as written.
pub fn parse_config(content: &str) -> Result<(AppConfig, Vec<String>), toml::de::Error> {
    let raw: RawConfig = toml::from_str(content)?;
    Ok(validate(raw, Path::new("")))
}

/// Validate each field against named constants, accumulating all warnings.
fn validate(raw: RawConfig, base_dir: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig::default();
    let sim = &raw.simulation;

    // -- Simulation: intervals --
    let intervals = [
        (
            "collector_connect_delay_ms",
            sim.collector_connect_delay_ms,
            &mut config.collector_connect_delay_ms,
        ),
        ("collector_tick_ms", sim.collector_tick_ms, &mut config.collector_tick_ms),
        ("pdf_tick_ms", sim.pdf_tick_ms, &mut config.pdf_tick_ms),
        ("nonpdf_tick_ms", sim.nonpdf_tick_ms, &mut config.nonpdf_tick_ms),
        ("batch_delay_ms", sim.batch_delay_ms, &mut config.batch_delay_ms),
        (
            "rebalance_delay_ms",
            sim.rebalance_delay_ms,
            &mut config.rebalance_delay_ms,
        ),
    ];
    for (key, value, slot) in intervals {
        apply_bounded(
            "simulation",
            key,
            value,
            constants::MIN_SIMULATION_INTERVAL_MS,
            constants::MAX_SIMULATION_INTERVAL_MS,
            slot,
            &mut warnings,
        );
    }

    // -- Simulation: progress steps --
    let steps = [
        ("collector_step", sim.collector_step, &mut config.collector_step),
        ("pdf_step", sim.pdf_step, &mut config.pdf_step),
        ("nonpdf_step", sim.nonpdf_step, &mut config.nonpdf_step),
    ];
    for (key, value, slot) in steps {
        apply_bounded(
            "simulation",
            key,
            value,
            constants::MIN_PROGRESS_STEP,
            constants::MAX_PROGRESS,
            slot,
            &mut warnings,
        );
    }

    // -- Simulation: documents per run --
    if let Some(documents) = sim.collector_documents {
        config.collector_documents = documents;
    }

    // -- Balancer: tolerance --
    apply_bounded(
        "balancer",
        "tolerance",
        raw.balancer.tolerance,
        constants::MIN_BALANCE_TOLERANCE,
        constants::MAX_BALANCE_TOLERANCE,
        &mut config.balance_tolerance,
        &mut warnings,
    );

    // -- Seed: file --
    if let Some(ref file) = raw.seed.file {
        if !file.trim().is_empty() {
            config.seed_file = Some(base_dir.join(file));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Store `value` in `slot` if it lies in `[min, max]`; otherwise keep the
/// default already in `slot` and record a warning.
fn apply_bounded<T>(
    section: &str,
    key: &str,
    value: Option<T>,
    min: T,
    max: T,
    slot: &mut T,
    warnings: &mut Vec<String>,
) where
    T: PartialOrd + Copy + Display,
{
    let Some(value) = value else {
        return;
    };
    // NaN fails both comparisons and falls through to the warning.
    if value >= min && value <= max {
        *slot = value;
    } else {
        warnings.push(format!(
            "[{section}] {key} = {value} is out of range ({min}-{max}). Using default ({}).",
            *slot
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let (config, warnings) = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_values_are_applied() {
        let (config, warnings) = parse_config(
            r#"
[simulation]
pdf_tick_ms = 50
nonpdf_step = 25
collector_documents = 3

[balancer]
tolerance = 0.05

[logging]
level = "DEBUG"
"#,
        )
        .unwrap();

        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.pdf_tick_ms, 50);
        assert_eq!(config.nonpdf_step, 25);
        assert_eq!(config.collector_documents, 3);
        assert_eq!(config.balance_tolerance, 0.05);
        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_out_of_range_values_fall_back_with_warnings() {
        let (config, warnings) = parse_config(
            r#"
[simulation]
pdf_tick_ms = 0
batch_delay_ms = 999999
pdf_step = 101

[balancer]
tolerance = 0.9

[logging]
level = "loud"
"#,
        )
        .unwrap();

        assert_eq!(warnings.len(), 5, "{warnings:?}");
        assert_eq!(config, AppConfig::default());
        assert!(warnings[0].contains("[simulation] pdf_tick_ms = 0"));
        assert!(warnings.iter().any(|w| w.contains("[balancer] tolerance")));
    }

    #[test]
    fn test_nan_tolerance_is_rejected() {
        let (config, warnings) = parse_config("[balancer]\ntolerance = nan").unwrap();
        assert_eq!(config.balance_tolerance, constants::DEFAULT_BALANCE_TOLERANCE);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (_, warnings) =
            parse_config("[ui]\ntheme = \"dark\"\n[simulation]\nspeed = 3").unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_config_dir_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_malformed_file_warns_but_explicit_load_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        std::fs::write(&path, "[simulation\npdf_tick_ms = ").unwrap();

        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);

        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_relative_seed_path_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        std::fs::write(&path, "[seed]\nfile = \"datasets/small.toml\"").unwrap();

        let (config, _) = load_config_file(&path).unwrap();
        assert_eq!(
            config.seed_file,
            Some(dir.path().join("datasets/small.toml"))
        );
    }
}
