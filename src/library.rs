//! Baseline Library - Enforceable Requirement Catalogs
//!
//! A baseline library is the shared, read-only catalog of requirement
//! templates for one component type. Loading compiles every applicability
//! condition up front, so authoring defects (duplicate ids, malformed
//! conditions) fail the load instead of skewing a generation run later.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::conditions::{Condition, ConditionError};

fn default_true() -> bool {
    true
}

fn default_req_type() -> String {
    "unknown".to_string()
}

fn default_min_version() -> String {
    crate::MIN_LIBRARY_VERSION.to_string()
}

/// Catalog lifecycle tag. Carried through to the instance untouched;
/// applicability is condition-driven only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    #[default]
    Active,
    Draft,
    Deprecated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Verification {
    #[serde(default)]
    pub method: Vec<String>,
    #[serde(default)]
    pub acceptance: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Applicability {
    #[serde(default)]
    pub when: Vec<String>,
}

/// One catalog entry. Text fields may contain `{{param}}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub id: String,
    pub text: String,
    #[serde(rename = "type", default = "default_req_type")]
    pub req_type: String,
    #[serde(default)]
    pub status: LifecycleStatus,
    #[serde(default)]
    pub verification: Verification,
    #[serde(default)]
    pub provenance_refs: Vec<String>,
    #[serde(default)]
    pub applicability: Applicability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementSet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// Per-library quality gate configuration. Baselines carry their own rule
/// toggles the way templates carry their own contracts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityGateConfig {
    #[serde(default)]
    pub rules: GateRules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateRules {
    #[serde(default)]
    pub verification: RuleConfig,
    #[serde(default)]
    pub acceptance: RuleConfig,
    #[serde(default)]
    pub placeholders: RuleConfig,
    #[serde(default)]
    pub shall_wording: RuleConfig,
    #[serde(default)]
    pub atomicity: AtomicityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// More than this many occurrences of "shall" flags a compound
    /// requirement.
    #[serde(default = "default_max_shall")]
    pub max_shall_occurrences: usize,
}

fn default_max_shall() -> usize {
    1
}

impl Default for AtomicityConfig {
    fn default() -> Self {
        Self { enabled: true, max_shall_occurrences: default_max_shall() }
    }
}

/// Baseline library document as authored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineLibrary {
    pub library_id: String,
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default = "default_min_version")]
    pub engine_min_version: String,
    #[serde(default)]
    pub validation: QualityGateConfig,
    #[serde(default)]
    pub requirement_sets: Vec<RequirementSet>,
}

impl BaselineLibrary {
    /// Requirements in document order, sets flattened.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requirement_sets.iter().flat_map(|set| set.requirements.iter())
    }

    /// Compile the library: parse every condition, reject duplicate ids.
    pub fn compile(self) -> Result<CompiledLibrary, LibraryError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut requirements: Vec<CompiledRequirement> = vec![];

        for requirement in self.requirements() {
            if !seen.insert(requirement.id.clone()) {
                return Err(LibraryError::DuplicateRequirementId {
                    library_id: self.library_id.clone(),
                    id: requirement.id.clone(),
                });
            }

            let mut when: Vec<Condition> = vec![];
            for raw in &requirement.applicability.when {
                let condition = Condition::parse(raw).map_err(|source| {
                    LibraryError::MalformedCondition { id: requirement.id.clone(), source }
                })?;
                when.push(condition);
            }

            requirements.push(CompiledRequirement { requirement: requirement.clone(), when });
        }

        Ok(CompiledLibrary {
            library_id: self.library_id,
            name: self.name,
            version: self.version,
            engine_min_version: self.engine_min_version,
            validation: self.validation,
            requirements,
        })
    }
}

/// A catalog entry with its `when` list parsed.
#[derive(Debug, Clone)]
pub struct CompiledRequirement {
    pub requirement: Requirement,
    pub when: Vec<Condition>,
}

/// A baseline library ready for repeated evaluation. Read-only after
/// compilation; safe to share across concurrent generation runs.
#[derive(Debug, Clone)]
pub struct CompiledLibrary {
    pub library_id: String,
    pub name: String,
    pub version: String,
    pub engine_min_version: String,
    pub validation: QualityGateConfig,
    pub requirements: Vec<CompiledRequirement>,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("duplicate requirement id '{id}' in library '{library_id}'")]
    DuplicateRequirementId { library_id: String, id: String },

    #[error("malformed condition on requirement '{id}': {source}")]
    MalformedCondition {
        id: String,
        #[source]
        source: ConditionError,
    },

    #[error("failed to read baseline library: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse baseline library: {0}")]
    Json(#[from] serde_json::Error),
}

/// Baseline registry - loads and caches compiled libraries
pub struct BaselineRegistry {
    libraries: HashMap<String, CompiledLibrary>,
}

impl BaselineRegistry {
    pub fn new() -> Self {
        Self { libraries: HashMap::new() }
    }

    /// Load every `*.json` baseline in a directory. Any authoring defect
    /// (unreadable file, bad JSON, duplicate id, malformed condition)
    /// fails the whole load.
    pub fn load_from_dir(dir: &Path) -> Result<Self, LibraryError> {
        let mut registry = Self::new();
        if !dir.exists() {
            return Ok(registry);
        }

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |e| e == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)?;
            let library: BaselineLibrary = serde_json::from_str(&content)?;
            registry.register(library)?;
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&CompiledLibrary> {
        self.libraries.get(id)
    }

    /// Registered libraries, ordered by id.
    pub fn list(&self) -> Vec<&CompiledLibrary> {
        let mut libraries: Vec<_> = self.libraries.values().collect();
        libraries.sort_by(|a, b| a.library_id.cmp(&b.library_id));
        libraries
    }

    pub fn register(&mut self, library: BaselineLibrary) -> Result<(), LibraryError> {
        let compiled = library.compile()?;
        self.libraries.insert(compiled.library_id.clone(), compiled);
        Ok(())
    }
}

impl Default for BaselineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_json(requirements: &str) -> String {
        format!(
            r#"{{
                "library_id": "valve_baseline",
                "version": "2.1.0",
                "requirement_sets": [{{"name": "general", "requirements": {}}}]
            }}"#,
            requirements
        )
    }

    #[test]
    fn requirement_defaults() {
        let req: Requirement =
            serde_json::from_str(r#"{"id": "R-1", "text": "The valve shall close."}"#).unwrap();
        assert_eq!(req.req_type, "unknown");
        assert_eq!(req.status, LifecycleStatus::Active);
        assert!(req.verification.method.is_empty());
        assert!(req.applicability.when.is_empty());
    }

    #[test]
    fn compile_parses_conditions_in_order() {
        let library: BaselineLibrary = serde_json::from_str(&library_json(
            r#"[
                {"id": "R-1", "text": "a", "applicability": {"when": ["always"]}},
                {"id": "R-2", "text": "b", "applicability": {"when": ["pressure>100", "actuation_type=motor"]}}
            ]"#,
        ))
        .unwrap();

        let compiled = library.compile().unwrap();
        assert_eq!(compiled.requirements.len(), 2);
        assert_eq!(compiled.requirements[0].requirement.id, "R-1");
        assert_eq!(compiled.requirements[1].when.len(), 2);
    }

    #[test]
    fn compile_rejects_duplicate_ids() {
        let library: BaselineLibrary = serde_json::from_str(&library_json(
            r#"[
                {"id": "R-1", "text": "a"},
                {"id": "R-1", "text": "b"}
            ]"#,
        ))
        .unwrap();

        let err = library.compile().unwrap_err();
        assert!(matches!(
            err,
            LibraryError::DuplicateRequirementId { ref id, .. } if id == "R-1"
        ));
    }

    #[test]
    fn compile_rejects_malformed_condition_naming_requirement() {
        let library: BaselineLibrary = serde_json::from_str(&library_json(
            r#"[{"id": "R-9", "text": "a", "applicability": {"when": ["no operator here"]}}]"#,
        ))
        .unwrap();

        let err = library.compile().unwrap_err();
        match err {
            LibraryError::MalformedCondition { id, .. } => assert_eq!(id, "R-9"),
            other => panic!("expected MalformedCondition, got {other:?}"),
        }
    }

    #[test]
    fn flattens_sets_in_document_order() {
        let library: BaselineLibrary = serde_json::from_str(
            r#"{
                "library_id": "lib",
                "version": "1.0.0",
                "requirement_sets": [
                    {"name": "one", "requirements": [{"id": "A", "text": "a"}, {"id": "B", "text": "b"}]},
                    {"name": "two", "requirements": [{"id": "C", "text": "c"}]}
                ]
            }"#,
        )
        .unwrap();

        let ids: Vec<_> = library.requirements().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn registry_loads_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("valve.json"),
            library_json(r#"[{"id": "R-1", "text": "The valve shall close."}]"#),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = BaselineRegistry::load_from_dir(dir.path()).unwrap();
        assert!(registry.get("valve_baseline").is_some());
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn registry_load_fails_on_bad_baseline() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bad.json"),
            library_json(r#"[{"id": "R-1", "text": "a", "applicability": {"when": ["???"]}}]"#),
        )
        .unwrap();

        assert!(BaselineRegistry::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn gate_config_defaults() {
        let config: QualityGateConfig = serde_json::from_str("{}").unwrap();
        assert!(config.rules.verification.enabled);
        assert!(config.rules.atomicity.enabled);
        assert_eq!(config.rules.atomicity.max_shall_occurrences, 1);
    }
}
