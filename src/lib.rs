//! ReqForge Core - Deterministic Requirements Compiler
//!
//! # The Six Laws (Non-Negotiable)
//! 1. The Baseline Is Truth
//! 2. Conditions Are Contracts
//! 3. Validation Is Protective
//! 4. Deterministic Output
//! 5. Missing Data Is Never Fatal
//! 6. Authors Suggest, Engine Enforces

pub mod component;
pub mod conditions;
pub mod filter;
pub mod hashing;
pub mod instantiate;
pub mod library;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod validation;

pub use conditions::{CmpOp, Condition, ConditionError, ConditionOutcome};
pub use filter::{partition, NonApplicableRequirement, Partition};
pub use hashing::{canonical_json, compute_manifest_hash, compute_run_hash};
pub use instantiate::{instantiate, InstanceStatus, InstantiatedRequirement};
pub use library::{BaselineLibrary, BaselineRegistry, CompiledLibrary, LibraryError, Requirement};
pub use pipeline::{GenerateRequest, GenerationPipeline, PipelineError, RequirementsInstance};
pub use profile::{AttributeValue, Profile};
pub use report::{build_report, SummaryReport};
pub use validation::{
    Finding, FindingCategory, GatePolicy, GateVerdict, OverallStatus, Severity, ValidationReport,
    ValidationRule, Validator,
};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_LIBRARY_VERSION: &str = "1.0.0";
