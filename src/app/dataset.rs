// corpusboard - app/dataset.rs
//
// Chooses and loads the seed dataset: the built-in one embedded in the
// binary, or a user-supplied TOML file from disk.

use crate::core::seed::{self, Dataset};
use crate::util::constants;
use crate::util::error::SeedError;
use std::path::Path;

/// Load the dataset at `path`, or the built-in one when `path` is `None`.
pub fn load_dataset(path: Option<&Path>) -> Result<Dataset, SeedError> {
    match path {
        Some(path) => load_dataset_file(path),
        None => {
            let dataset = seed::load_builtin()?;
            tracing::info!("Loaded built-in dataset");
            Ok(dataset)
        }
    }
}

/// Read, size-check and validate a dataset file.
pub fn load_dataset_file(path: &Path) -> Result<Dataset, SeedError> {
    let metadata = std::fs::metadata(path).map_err(|e| SeedError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if metadata.len() > constants::MAX_SEED_FILE_SIZE {
        return Err(SeedError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_SEED_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| SeedError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let dataset = seed::parse_dataset(&content, path)?;
    tracing::info!(path = %path.display(), "Loaded dataset file");
    Ok(dataset)
}
