//! Validation System - Quality Gate
//!
//! Rules produce structured findings.
//! Policy maps findings to exit decisions.
//!
//! Completeness checks (verification, acceptance) are errors; placeholder
//! and wording heuristics are warnings. TBDs are a tracked state, not a
//! defect. The whole pass is deterministic: same input, same report.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::instantiate::{InstantiatedRequirement, PLACEHOLDER_RE};
use crate::library::QualityGateConfig;

static SHALL_CONJUNCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bshall\b.*\band\b.*\bshall\b").unwrap());

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Sort rank: errors first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCategory {
    MissingVerification,
    MissingAcceptance,
    UnresolvedPlaceholder,
    UntrackedPlaceholder,
    MissingShallWording,
    NonAtomicRequirement,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::MissingVerification => "missing-verification",
            FindingCategory::MissingAcceptance => "missing-acceptance",
            FindingCategory::UnresolvedPlaceholder => "unresolved-placeholder",
            FindingCategory::UntrackedPlaceholder => "untracked-placeholder",
            FindingCategory::MissingShallWording => "missing-shall-wording",
            FindingCategory::NonAtomicRequirement => "non-atomic-requirement",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    pub category: FindingCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub overall_status: OverallStatus,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub finding_count: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

/// Validation rule trait - produces findings for one instantiated
/// requirement, honoring the library's gate configuration.
/// Rules are stateless; the validator can be shared across runs.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, req: &InstantiatedRequirement, config: &QualityGateConfig) -> Vec<Finding>;
}

fn finding(
    severity: Severity,
    category: FindingCategory,
    req: &InstantiatedRequirement,
    message: String,
) -> Finding {
    Finding { severity, category, requirement_id: Some(req.id.clone()), message }
}

// requirements wording is typically "shall"; keep it heuristic
fn has_shall(text: &str) -> bool {
    padded_lower(text).contains(" shall ")
}

fn shall_count(text: &str) -> usize {
    padded_lower(text).matches(" shall ").count()
}

fn padded_lower(text: &str) -> String {
    format!(" {} ", text.to_lowercase())
}

// --- Concrete Rules ---

pub struct VerificationMethodRule;

impl ValidationRule for VerificationMethodRule {
    fn name(&self) -> &'static str {
        "verification_method"
    }

    fn check(&self, req: &InstantiatedRequirement, config: &QualityGateConfig) -> Vec<Finding> {
        if !config.rules.verification.enabled {
            return vec![];
        }
        if req.verification.method.is_empty() {
            vec![finding(
                Severity::Error,
                FindingCategory::MissingVerification,
                req,
                "verification.method must be a non-empty list".to_string(),
            )]
        } else {
            vec![]
        }
    }
}

pub struct AcceptanceCriteriaRule;

impl ValidationRule for AcceptanceCriteriaRule {
    fn name(&self) -> &'static str {
        "acceptance_criteria"
    }

    fn check(&self, req: &InstantiatedRequirement, config: &QualityGateConfig) -> Vec<Finding> {
        if !config.rules.acceptance.enabled {
            return vec![];
        }
        if req.verification.acceptance.trim().is_empty() {
            vec![finding(
                Severity::Error,
                FindingCategory::MissingAcceptance,
                req,
                "verification.acceptance must be a non-empty string".to_string(),
            )]
        } else {
            vec![]
        }
    }
}

/// Leftover `{{...}}` tokens must be accounted for in `tbd_parameters`.
/// Tracked leftovers are an expected state (warning); untracked ones mean
/// the instantiation audit trail is broken (error).
pub struct PlaceholderRule;

impl PlaceholderRule {
    fn unresolved(req: &InstantiatedRequirement) -> Vec<String> {
        let mut keys: Vec<String> = vec![];
        let fields = std::iter::once(req.text.as_str())
            .chain(req.verification.method.iter().map(String::as_str))
            .chain(std::iter::once(req.verification.acceptance.as_str()));
        for field in fields {
            for caps in PLACEHOLDER_RE.captures_iter(field) {
                let key = caps[1].to_string();
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        keys
    }
}

impl ValidationRule for PlaceholderRule {
    fn name(&self) -> &'static str {
        "placeholders"
    }

    fn check(&self, req: &InstantiatedRequirement, config: &QualityGateConfig) -> Vec<Finding> {
        if !config.rules.placeholders.enabled {
            return vec![];
        }

        let unresolved = Self::unresolved(req);
        if unresolved.is_empty() {
            return vec![];
        }

        let untracked: Vec<&String> =
            unresolved.iter().filter(|k| !req.tbd_parameters.contains(k)).collect();

        if !untracked.is_empty() {
            vec![finding(
                Severity::Error,
                FindingCategory::UntrackedPlaceholder,
                req,
                format!("unresolved placeholders not tracked as TBD: {:?}", untracked),
            )]
        } else {
            vec![finding(
                Severity::Warning,
                FindingCategory::UnresolvedPlaceholder,
                req,
                format!("requirement has unresolved placeholders awaiting inputs: {:?}", unresolved),
            )]
        }
    }
}

pub struct ShallWordingRule;

impl ValidationRule for ShallWordingRule {
    fn name(&self) -> &'static str {
        "shall_wording"
    }

    fn check(&self, req: &InstantiatedRequirement, config: &QualityGateConfig) -> Vec<Finding> {
        if !config.rules.shall_wording.enabled {
            return vec![];
        }
        // programmatic requirements are exempt from "shall" wording
        if req.req_type == "programmatic" {
            return vec![];
        }
        if !has_shall(&req.text) {
            vec![finding(
                Severity::Warning,
                FindingCategory::MissingShallWording,
                req,
                "requirement text does not contain 'shall'; confirm wording".to_string(),
            )]
        } else {
            vec![]
        }
    }
}

/// Heuristic, not proof: flags text that likely bundles several testable
/// statements into one requirement.
pub struct AtomicityRule;

impl ValidationRule for AtomicityRule {
    fn name(&self) -> &'static str {
        "atomicity"
    }

    fn check(&self, req: &InstantiatedRequirement, config: &QualityGateConfig) -> Vec<Finding> {
        let atomicity = &config.rules.atomicity;
        if !atomicity.enabled {
            return vec![];
        }

        let mut findings: Vec<Finding> = vec![];
        let lower = req.text.to_lowercase();

        if lower.contains("and/or") {
            findings.push(finding(
                Severity::Warning,
                FindingCategory::NonAtomicRequirement,
                req,
                "requirement contains 'and/or' which is often ambiguous; consider splitting"
                    .to_string(),
            ));
        }

        let count = shall_count(&req.text);
        if count > atomicity.max_shall_occurrences {
            findings.push(finding(
                Severity::Warning,
                FindingCategory::NonAtomicRequirement,
                req,
                format!("requirement contains {} occurrences of 'shall'; may be compound", count),
            ));
        }

        if SHALL_CONJUNCTION_RE.is_match(&lower) {
            findings.push(finding(
                Severity::Warning,
                FindingCategory::NonAtomicRequirement,
                req,
                "requirement may be compound ('shall ... and ... shall ...'); consider splitting"
                    .to_string(),
            ));
        }

        findings
    }
}

/// Validator orchestrates rules over the instantiated set.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(VerificationMethodRule),
                Box::new(AcceptanceCriteriaRule),
                Box::new(PlaceholderRule),
                Box::new(ShallWordingRule),
                Box::new(AtomicityRule),
            ],
        }
    }

    /// One ordered pass over the applicable requirements; finding order
    /// follows requirement order of first appearance.
    pub fn validate(
        &self,
        requirements: &[InstantiatedRequirement],
        config: &QualityGateConfig,
    ) -> ValidationReport {
        let mut findings: Vec<Finding> = vec![];
        for req in requirements {
            for rule in &self.rules {
                findings.extend(rule.check(req, config));
            }
        }

        let error_count = findings.iter().filter(|f| f.severity == Severity::Error).count();
        let warning_count = findings.iter().filter(|f| f.severity == Severity::Warning).count();
        let info_count = findings.iter().filter(|f| f.severity == Severity::Info).count();

        let overall_status =
            if error_count > 0 { OverallStatus::Fail } else { OverallStatus::Pass };

        ValidationReport {
            overall_status,
            error_count,
            warning_count,
            info_count,
            finding_count: findings.len(),
            findings,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller policy for turning a report into a process-level verdict.
/// Explicit per-run configuration, never a global toggle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GatePolicy {
    pub strict: bool,
    pub fail_on_warnings: bool,
    pub max_warnings: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Pass,
    FailedErrors,
    FailedWarnings,
    WarningBudgetExceeded,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        *self == GateVerdict::Pass
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            GateVerdict::Pass => 0,
            GateVerdict::FailedErrors => 2,
            GateVerdict::FailedWarnings => 3,
            GateVerdict::WarningBudgetExceeded => 4,
        }
    }
}

impl GatePolicy {
    pub fn verdict(&self, report: &ValidationReport) -> GateVerdict {
        if self.strict && report.overall_status == OverallStatus::Fail {
            return GateVerdict::FailedErrors;
        }
        if self.fail_on_warnings && report.warning_count > 0 {
            return GateVerdict::FailedWarnings;
        }
        if let Some(max) = self.max_warnings {
            if report.warning_count > max {
                return GateVerdict::WarningBudgetExceeded;
            }
        }
        GateVerdict::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instantiate::{AppliedConditions, InstanceStatus};
    use crate::library::Verification;
    use std::collections::BTreeMap;

    fn inst(text: &str, method: &[&str], acceptance: &str, tbd: &[&str]) -> InstantiatedRequirement {
        InstantiatedRequirement {
            id: "R-1".to_string(),
            text: text.to_string(),
            req_type: "performance".to_string(),
            verification: Verification {
                method: method.iter().map(|m| m.to_string()).collect(),
                acceptance: acceptance.to_string(),
            },
            provenance_refs: vec![],
            status: if tbd.is_empty() { InstanceStatus::Draft } else { InstanceStatus::ReviewRequired },
            parameter_values: BTreeMap::new(),
            tbd_parameters: tbd.iter().map(|k| k.to_string()).collect(),
            applicability: AppliedConditions { conditions: vec![], matched: true },
        }
    }

    fn config() -> QualityGateConfig {
        QualityGateConfig::default()
    }

    #[test]
    fn missing_verification_method_is_error() {
        let report = Validator::new()
            .validate(&[inst("The valve shall close.", &[], "Recorded.", &[])], &config());
        assert_eq!(report.error_count, 1);
        assert_eq!(report.findings[0].category, FindingCategory::MissingVerification);
        assert_eq!(report.overall_status, OverallStatus::Fail);
    }

    #[test]
    fn missing_acceptance_is_error() {
        let report = Validator::new()
            .validate(&[inst("The valve shall close.", &["Test"], "   ", &[])], &config());
        assert_eq!(report.error_count, 1);
        assert_eq!(report.findings[0].category, FindingCategory::MissingAcceptance);
    }

    #[test]
    fn tracked_placeholder_is_warning() {
        let report = Validator::new().validate(
            &[inst("Pressure shall exceed {{min_pressure}}.", &["Test"], "ok", &["min_pressure"])],
            &config(),
        );
        assert_eq!(report.error_count, 0);
        assert!(report
            .findings
            .iter()
            .any(|f| f.category == FindingCategory::UnresolvedPlaceholder
                && f.severity == Severity::Warning));
        assert_eq!(report.overall_status, OverallStatus::Pass);
    }

    #[test]
    fn untracked_placeholder_is_error() {
        let report = Validator::new().validate(
            &[inst("Pressure shall exceed {{min_pressure}}.", &["Test"], "ok", &[])],
            &config(),
        );
        assert!(report
            .findings
            .iter()
            .any(|f| f.category == FindingCategory::UntrackedPlaceholder
                && f.severity == Severity::Error));
        assert_eq!(report.overall_status, OverallStatus::Fail);
    }

    #[test]
    fn missing_shall_is_warning_except_programmatic() {
        let report = Validator::new()
            .validate(&[inst("The valve closes quickly.", &["Test"], "ok", &[])], &config());
        assert!(report.findings.iter().any(|f| f.category == FindingCategory::MissingShallWording));

        let mut programmatic = inst("Supplier provides records.", &["Review"], "ok", &[]);
        programmatic.req_type = "programmatic".to_string();
        let report = Validator::new().validate(&[programmatic], &config());
        assert!(!report.findings.iter().any(|f| f.category == FindingCategory::MissingShallWording));
    }

    #[test]
    fn atomicity_flags_and_or_and_multi_shall() {
        let report = Validator::new().validate(
            &[inst("The valve shall open and/or shall close and shall latch.", &["Test"], "ok", &[])],
            &config(),
        );
        let atomicity: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.category == FindingCategory::NonAtomicRequirement)
            .collect();
        // and/or + three 'shall' + conjunction pattern
        assert_eq!(atomicity.len(), 3);
        assert!(atomicity.iter().all(|f| f.severity == Severity::Warning));
    }

    #[test]
    fn atomicity_threshold_is_configurable() {
        let mut config = config();
        config.rules.atomicity.max_shall_occurrences = 3;
        let report = Validator::new().validate(
            &[inst("The valve shall open and the valve shall close.", &["Test"], "ok", &[])],
            &config,
        );
        // count 2 <= 3, but the conjunction pattern still fires
        let atomicity: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.category == FindingCategory::NonAtomicRequirement)
            .collect();
        assert_eq!(atomicity.len(), 1);
    }

    #[test]
    fn disabled_rules_produce_nothing() {
        let mut config = config();
        config.rules.verification.enabled = false;
        config.rules.acceptance.enabled = false;
        config.rules.shall_wording.enabled = false;
        config.rules.atomicity.enabled = false;
        config.rules.placeholders.enabled = false;

        let report = Validator::new()
            .validate(&[inst("No shall here {{x}} and/or whatever.", &[], "", &[])], &config);
        assert_eq!(report.finding_count, 0);
        assert_eq!(report.overall_status, OverallStatus::Pass);
    }

    #[test]
    fn validation_is_deterministic_and_idempotent() {
        let reqs = vec![
            inst("The valve shall close.", &[], "", &[]),
            inst("Rating {{r}} shall hold.", &["Test"], "ok", &["r"]),
        ];
        let validator = Validator::new();
        let first = validator.validate(&reqs, &config());
        let second = validator.validate(&reqs, &config());
        assert_eq!(first, second);
    }

    #[test]
    fn finding_order_follows_requirement_order() {
        let mut second = inst("The pump shall run.", &[], "", &[]);
        second.id = "R-2".to_string();
        let reqs = vec![inst("The valve shall close.", &[], "", &[]), second];

        let report = Validator::new().validate(&reqs, &config());
        let ids: Vec<_> =
            report.findings.iter().filter_map(|f| f.requirement_id.as_deref()).collect();
        let first_r2 = ids.iter().position(|id| *id == "R-2").unwrap();
        assert!(ids[..first_r2].iter().all(|id| *id == "R-1"));
    }

    #[test]
    fn gate_policy_exit_codes() {
        let validator = Validator::new();
        let failing = validator.validate(&[inst("The valve shall close.", &[], "", &[])], &config());
        assert!(failing.has_errors());

        let warning_only =
            validator.validate(&[inst("Rating {{r}}, shall hold.", &["Test"], "ok", &["r"])], &config());
        assert_eq!(warning_only.error_count, 0);
        assert!(warning_only.warning_count > 0);

        let relaxed = GatePolicy::default();
        assert_eq!(relaxed.verdict(&failing).exit_code(), 0);
        assert_eq!(relaxed.verdict(&warning_only).exit_code(), 0);

        let strict = GatePolicy { strict: true, ..Default::default() };
        assert_eq!(strict.verdict(&failing).exit_code(), 2);
        assert_eq!(strict.verdict(&warning_only).exit_code(), 0);

        let no_warnings = GatePolicy { fail_on_warnings: true, ..Default::default() };
        assert_eq!(no_warnings.verdict(&warning_only).exit_code(), 3);

        let budget = GatePolicy { max_warnings: Some(0), ..Default::default() };
        assert_eq!(budget.verdict(&warning_only).exit_code(), 4);
        let roomy = GatePolicy { max_warnings: Some(10), ..Default::default() };
        assert!(roomy.verdict(&warning_only).passed());
    }
}
