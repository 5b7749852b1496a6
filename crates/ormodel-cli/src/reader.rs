use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use ormodel_core::{ManagedTypeMetadata, MappingFile};

pub const PERSISTENCE_CONFIG: &str = "persistence.yaml";
const DEFAULT_MAPPING_FILE: &str = "orm.json";
const DEFAULT_SOURCE_PATTERN: &str = "**/*.meta.json";

/// Persistence descriptor from persistence.yaml.
#[derive(Debug, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub units: Vec<PersistenceUnit>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceUnit {
    pub name: String,
    /// Restricts the built types when non-empty.
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub mapping_files: Vec<String>,
    /// Glob patterns for metadata files, relative to the descriptor.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Everything needed to build one unit's metamodel.
#[derive(Debug, Default)]
pub struct LoadedUnit {
    pub name: Option<String>,
    pub sources: Vec<String>,
    pub metadata: Vec<ManagedTypeMetadata>,
    pub overlays: Vec<MappingFile>,
    pub classes: Vec<String>,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Load metadata from a file or a directory.
///
/// A directory with a persistence.yaml follows the selected unit; without
/// one, every `*.meta.json` below it is read and `orm.json` is applied as
/// an overlay when present.
pub fn load_unit(input_path: &Path, unit_name: Option<&str>) -> Result<LoadedUnit, String> {
    if !input_path.exists() {
        return Err(format!("Path does not exist: {}", input_path.display()));
    }

    if input_path.is_file() {
        let path = input_path.to_string_lossy().to_string();
        return Ok(LoadedUnit {
            metadata: read_metadata_file(input_path)?,
            sources: vec![path],
            ..Default::default()
        });
    }

    if input_path.is_dir() {
        let config_path = input_path.join(PERSISTENCE_CONFIG);
        let unit = if config_path.exists() {
            Some(select_unit(&config_path, unit_name)?)
        } else {
            if let Some(name) = unit_name {
                return Err(format!(
                    "Persistence unit {name} requested but no {PERSISTENCE_CONFIG} in {}",
                    input_path.display()
                ));
            }
            None
        };
        return load_directory(input_path, unit);
    }

    Err(format!(
        "Path is neither a file nor a directory: {}",
        input_path.display()
    ))
}

fn select_unit(config_path: &Path, unit_name: Option<&str>) -> Result<PersistenceUnit, String> {
    let yaml = fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read {}: {e}", config_path.display()))?;
    let config: PersistenceConfig = serde_yaml::from_str(&yaml)
        .map_err(|e| format!("Invalid {PERSISTENCE_CONFIG}: {e}"))?;

    let unit = match unit_name {
        Some(name) => config.units.into_iter().find(|u| u.name == name),
        None => config.units.into_iter().next(),
    };
    match (unit, unit_name) {
        (Some(u), _) => {
            info!(unit = %u.name, "persistence unit selected");
            Ok(u)
        }
        (None, Some(name)) => Err(format!(
            "Persistence unit {name} not found in {PERSISTENCE_CONFIG}"
        )),
        (None, None) => Err(format!("No persistence units in {PERSISTENCE_CONFIG}")),
    }
}

fn load_directory(dir: &Path, unit: Option<PersistenceUnit>) -> Result<LoadedUnit, String> {
    let unit = unit.unwrap_or_else(|| PersistenceUnit {
        name: String::new(),
        classes: Vec::new(),
        mapping_files: Vec::new(),
        sources: Vec::new(),
        properties: BTreeMap::new(),
    });

    let patterns = if unit.sources.is_empty() {
        vec![DEFAULT_SOURCE_PATTERN.to_string()]
    } else {
        unit.sources.clone()
    };

    let mapping_paths: Vec<PathBuf> = if unit.mapping_files.is_empty() {
        let default = dir.join(DEFAULT_MAPPING_FILE);
        if default.exists() {
            vec![default]
        } else {
            Vec::new()
        }
    } else {
        unit.mapping_files.iter().map(|m| dir.join(m)).collect()
    };

    let mut loaded = LoadedUnit {
        name: (!unit.name.is_empty()).then(|| unit.name.clone()),
        classes: unit.classes.clone(),
        properties: unit.properties.clone(),
        ..Default::default()
    };

    for path in glob_sources(dir, &patterns)? {
        if mapping_paths.contains(&path) {
            continue;
        }
        debug!(path = %path.display(), "reading metadata");
        loaded.metadata.extend(read_metadata_file(&path)?);
        loaded.sources.push(path.to_string_lossy().to_string());
    }

    for path in mapping_paths {
        if !path.exists() {
            return Err(format!("Mapping file not found: {}", path.display()));
        }
        debug!(path = %path.display(), "reading mapping file");
        let source = path.to_string_lossy().to_string();
        loaded.overlays.push(MappingFile {
            types: read_metadata_file(&path)?,
            source,
        });
    }

    Ok(loaded)
}

fn glob_sources(dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        let full_pattern = dir.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().replace('\\', "/");
        let entries = glob::glob(&pattern_str)
            .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => {
                    if path.is_file() && seen.insert(path.clone()) {
                        matched.push(path);
                    }
                }
                Err(e) => return Err(format!("Glob error: {}", e)),
            }
        }
        matched.sort();
        files.extend(matched);
    }

    Ok(files)
}

fn read_metadata_file(path: &Path) -> Result<Vec<ManagedTypeMetadata>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Invalid metadata in {}: {}", path.display(), e))
}
