//! Generation Pipeline - Single Entry Point
//!
//! CRITICAL: generate MUST run the quality gate internally. No bypass.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::component;
use crate::filter::{partition, NonApplicableRequirement};
use crate::hashing::{compute_manifest_hash, compute_run_hash};
use crate::instantiate::{instantiate, InstantiatedRequirement};
use crate::library::{BaselineRegistry, CompiledLibrary, LibraryError, QualityGateConfig};
use crate::profile::Profile;
use crate::validation::{ValidationReport, Validator};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Baseline library not found: {0}")]
    LibraryNotFound(String),

    #[error("Library {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// One generation run: which baseline, which profile, how to label it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub library_id: String,
    pub profile: Profile,
    /// Component kind used for labeling defaults (tag field, fallback tag).
    #[serde(default)]
    pub component: Option<String>,
    /// Explicit tag field override inside the profile.
    #[serde(default)]
    pub tag_field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceSummary {
    pub applicable_count: usize,
    pub non_applicable_count: usize,
    pub tbd_parameter_count: usize,
}

/// The assembled output document for one generation run. Never mutated
/// after assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsInstance {
    pub instance_id: String,
    pub component: String,
    pub library_id: String,
    pub library_version: String,
    pub engine_version: String,
    pub run_id: String,
    pub generated_utc: DateTime<Utc>,
    pub profile: Profile,
    pub summary: InstanceSummary,
    pub applicable_requirements: Vec<InstantiatedRequirement>,
    pub non_applicable_requirements: Vec<NonApplicableRequirement>,
    pub validation: ValidationReport,
    pub run_hash: String,
    pub manifest_hash: String,
}

/// Resolve the tag naming this instance: explicit field, else the
/// component's conventional `*_tag` field, else any populated `*_tag` key,
/// else the component name uppercased.
fn resolve_tag(profile: &Profile, component: &str, tag_field: Option<&str>) -> String {
    let mut field =
        tag_field.map(str::to_string).unwrap_or_else(|| component::tag_field_for(component));

    if profile.tag_value(&field).is_none() {
        if let Some(inferred) = profile.infer_tag_field() {
            field = inferred.to_string();
        }
    }

    profile.tag_value(&field).unwrap_or_else(|| component.to_uppercase())
}

/// Assemble the final instance document. Pure aggregation: requirement
/// partitions keep baseline order, findings keep validation order. The
/// manifest hash is computed last, over everything else.
pub fn assemble(
    library: &CompiledLibrary,
    profile: &Profile,
    applicable: Vec<InstantiatedRequirement>,
    non_applicable: Vec<NonApplicableRequirement>,
    validation: ValidationReport,
    component: &str,
    tag_field: Option<&str>,
) -> Result<RequirementsInstance, PipelineError> {
    let tbd_parameters: BTreeSet<&str> = applicable
        .iter()
        .flat_map(|req| req.tbd_parameters.iter().map(String::as_str))
        .collect();

    let tag = resolve_tag(profile, component, tag_field);
    let run_hash =
        compute_run_hash(&library.library_id, &library.version, profile, ENGINE_VERSION)?;

    let mut instance = RequirementsInstance {
        instance_id: format!("{}-requirements", tag),
        component: component.to_string(),
        library_id: library.library_id.clone(),
        library_version: library.version.clone(),
        engine_version: ENGINE_VERSION.to_string(),
        run_id: Uuid::new_v4().to_string(),
        generated_utc: Utc::now(),
        profile: profile.clone(),
        summary: InstanceSummary {
            applicable_count: applicable.len(),
            non_applicable_count: non_applicable.len(),
            tbd_parameter_count: tbd_parameters.len(),
        },
        applicable_requirements: applicable,
        non_applicable_requirements: non_applicable,
        validation,
        run_hash,
        manifest_hash: String::new(), // computed after
    };

    instance.manifest_hash = compute_manifest_hash(&instance)?;
    Ok(instance)
}

/// The generation pipeline - single entry point for all instance
/// operations.
pub struct GenerationPipeline {
    registry: BaselineRegistry,
    validator: Validator,
}

impl GenerationPipeline {
    pub fn new(registry: BaselineRegistry) -> Self {
        Self { registry, validator: Validator::new() }
    }

    /// Registered baseline libraries, ordered by id.
    pub fn list_libraries(&self) -> Vec<&CompiledLibrary> {
        self.registry.list()
    }

    pub fn get_library(&self, id: &str) -> Option<&CompiledLibrary> {
        self.registry.get(id)
    }

    /// Run the quality gate over an instantiated set.
    ///
    /// This is the ONLY validation entry point.
    pub fn validate_instantiated(
        &self,
        requirements: &[InstantiatedRequirement],
        config: &QualityGateConfig,
    ) -> ValidationReport {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        self.validator.validate(requirements, config)
    }

    /// Generate a requirements instance.
    ///
    /// CRITICAL: This ALWAYS runs the quality gate internally. No bypass
    /// possible. A syntactically valid baseline always yields an instance
    /// document; profile gaps surface as findings, never as errors.
    pub fn generate(&self, request: &GenerateRequest) -> Result<RequirementsInstance, PipelineError> {
        let library = self
            .registry
            .get(&request.library_id)
            .ok_or_else(|| PipelineError::LibraryNotFound(request.library_id.clone()))?;

        self.check_engine_version(library)?;

        let component = request.component.as_deref().unwrap_or("valve");
        tracing::debug!(
            library_id = %library.library_id,
            component,
            "generating requirements instance"
        );

        let partitioned = partition(library, &request.profile);
        let applicable: Vec<InstantiatedRequirement> = partitioned
            .applicable
            .iter()
            .map(|compiled| instantiate(&compiled.requirement, &request.profile))
            .collect();

        // MANDATORY: the quality gate always runs. This is non-negotiable.
        let validation = self.validate_instantiated(&applicable, &library.validation);

        tracing::info!(
            library_id = %library.library_id,
            applicable = applicable.len(),
            non_applicable = partitioned.non_applicable.len(),
            errors = validation.error_count,
            warnings = validation.warning_count,
            "generation pass complete"
        );

        assemble(
            library,
            &request.profile,
            applicable,
            partitioned.non_applicable,
            validation,
            component,
            request.tag_field.as_deref(),
        )
    }

    fn check_engine_version(&self, library: &CompiledLibrary) -> Result<(), PipelineError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| PipelineError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(&library.engine_min_version)
            .map_err(|_| PipelineError::InvalidVersion(library.engine_min_version.clone()))?;

        if engine_ver < min_ver {
            return Err(PipelineError::EngineVersionMismatch(
                library.library_id.clone(),
                library.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GenerationPipeline {
    fn default() -> Self {
        Self::new(BaselineRegistry::default())
    }
}
