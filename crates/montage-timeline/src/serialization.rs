//! Project serialization with versioning and migration.
//!
//! Uses JSON with a schema version field for forward-compatible persistence.

use montage_core::{CompositionId, EngineConfig, MontageError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::composition::Composition;
use crate::store::TimelineStore;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Everything needed to rebuild a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub active_composition_id: CompositionId,
    pub compositions: Vec<Composition>,
    #[serde(default)]
    pub config: EngineConfig,
}

/// Versioned project file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Schema version for migration.
    pub version: u32,
    /// The project data.
    pub project: Project,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl ProjectFile {
    /// Create a new project file from a project.
    pub fn new(project: Project) -> Self {
        Self {
            version: CURRENT_VERSION,
            project,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| MontageError::Serialization(format!("Failed to serialize project: {}", e)))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| MontageError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        if version > CURRENT_VERSION {
            return Err(MontageError::Serialization(format!(
                "Project file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| MontageError::Serialization(format!("Failed to parse project: {}", e)))
    }

    /// Save project to a file path.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        info!(path = %path.display(), "Saved project");
        Ok(())
    }

    /// Load project from a file path.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 files are a bare composition without a project wrapper.
                if data.get("version").is_none() {
                    let active = data.get("id").cloned().unwrap_or(serde_json::Value::Null);
                    let name = data
                        .get("name")
                        .cloned()
                        .unwrap_or_else(|| serde_json::Value::from("Untitled"));
                    data = serde_json::json!({
                        "version": 1,
                        "project": {
                            "name": name,
                            "active_composition_id": active,
                            "compositions": [data],
                        },
                        "app_version": "0.1.0",
                    });
                }
                version = 1;
            }
            _ => {
                return Err(MontageError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}

impl TimelineStore {
    /// Rebuild a store from a project, validating every composition.
    pub fn from_project(project: Project) -> Result<Self> {
        let Project {
            active_composition_id,
            compositions,
            config,
            ..
        } = project;
        config.validate()?;

        let (mut active, stored): (Vec<_>, Vec<_>) = compositions
            .into_iter()
            .partition(|c| c.id == active_composition_id);
        let active = active
            .pop()
            .ok_or(MontageError::CompositionNotFound(active_composition_id))?;

        let mut store = TimelineStore::new(active, config);
        // Nested references may point at any composition, so insert before
        // validating.
        let mut pending = stored;
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for comp in pending {
                let ready = comp
                    .nested_composition_ids()
                    .all(|id| store.composition(id).is_some());
                if ready {
                    store.add_composition(comp)?;
                } else {
                    deferred.push(comp);
                }
            }
            if deferred.len() == before {
                let missing = deferred[0]
                    .nested_composition_ids()
                    .find(|id| store.composition(*id).is_none())
                    .unwrap_or_default();
                return Err(MontageError::CompositionNotFound(missing));
            }
            pending = deferred;
        }
        store.validate_active()?;
        Ok(store)
    }

    /// Capture the store as a project.
    pub fn to_project(&self, name: impl Into<String>) -> Project {
        let mut compositions = vec![self.active().clone()];
        for id in self.composition_ids().into_iter().skip(1) {
            if let Some(comp) = self.composition(id) {
                compositions.push(comp.clone());
            }
        }
        Project {
            name: name.into(),
            active_composition_id: self.active_id(),
            compositions,
            config: self.config().clone(),
        }
    }
}
