//! Loading pipeline: finds data files, detects their format, checks
//! cross-references, and builds the registry and economy configuration.
//!
//! Every format deserializes into the shared schema in
//! [`hoard_core::data_loader`], so RON, TOML and JSON content is
//! interchangeable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hoard_core::config::EconomyConfig;
use hoard_core::data_loader::{self, RecipeData, RegistryData, ResourceData};
use hoard_core::economy::Economy;
use hoard_core::registry::{Registry, RegistryError};
use serde::de::DeserializeOwned;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An id reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// The same id was defined twice.
    #[error("duplicate id '{id}' in {file}")]
    DuplicateId { file: PathBuf, id: String },

    /// Content passed the file checks but was rejected by the schema builder.
    #[error(transparent)]
    Content(#[from] data_loader::DataLoadError),

    /// The registry refused to freeze.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML has no top-level arrays, so the
/// list is read from the array at `toml_key`; RON and JSON hold the list
/// directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Ron | Format::Json => deserialize_file(path),
        Format::Toml => {
            let content = std::fs::read_to_string(path)?;
            let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .cloned()
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Reference checks
// ===========================================================================

/// Collect resource ids, rejecting duplicates.
fn collect_resource_ids<'a>(
    resources: &'a [ResourceData],
    file: &Path,
) -> Result<HashSet<&'a str>, DataLoadError> {
    let mut ids = HashSet::new();
    for resource in resources {
        if !ids.insert(resource.id.as_str()) {
            return Err(DataLoadError::DuplicateId {
                file: file.to_path_buf(),
                id: resource.id.clone(),
            });
        }
    }
    Ok(ids)
}

/// Reject duplicate recipe ids and references to unknown resources.
fn check_recipes(
    recipes: &[RecipeData],
    resource_ids: &HashSet<&str>,
    file: &Path,
) -> Result<(), DataLoadError> {
    let mut seen = HashSet::new();
    for recipe in recipes {
        if !seen.insert(recipe.id.as_str()) {
            return Err(DataLoadError::DuplicateId {
                file: file.to_path_buf(),
                id: recipe.id.clone(),
            });
        }
        let referenced = recipe
            .inputs
            .iter()
            .map(|i| i.resource.as_str())
            .chain(recipe.outputs.iter().map(|o| o.resource.as_str()));
        for name in referenced {
            if !resource_ids.contains(name) {
                return Err(DataLoadError::UnresolvedRef {
                    file: file.to_path_buf(),
                    name: name.to_string(),
                    expected_kind: "resource",
                });
            }
        }
    }
    Ok(())
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Everything loaded from a content directory.
#[derive(Debug)]
pub struct GameData {
    pub registry: Arc<Registry>,
    pub config: EconomyConfig,
}

impl GameData {
    /// Create an empty economy over the loaded content.
    pub fn into_economy(self) -> Economy {
        Economy::new(self.registry, self.config)
    }
}

/// Load resources, recipes and economy configuration from `dir`.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let resources_path = require_data_file(dir, "resources")?;
    let resources: Vec<ResourceData> = deserialize_list(&resources_path, "resources")?;
    let resource_ids = collect_resource_ids(&resources, &resources_path)?;

    let recipes: Vec<RecipeData> = match find_data_file(dir, "recipes")? {
        Some(path) => {
            let recipes = deserialize_list(&path, "recipes")?;
            check_recipes(&recipes, &resource_ids, &path)?;
            recipes
        }
        None => Vec::new(),
    };

    let config = match find_data_file(dir, "economy")? {
        Some(path) => deserialize_file::<EconomyConfig>(&path)?.sanitized(),
        None => EconomyConfig::default(),
    };

    let registry = data_loader::build_registry(RegistryData { resources, recipes })?.build()?;
    tracing::debug!(
        dir = %dir.display(),
        resources = registry.resource_count(),
        recipes = registry.recipe_count(),
        "loaded game data"
    );

    Ok(GameData {
        registry: Arc::new(registry),
        config,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
