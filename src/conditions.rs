//! Applicability Conditions - Parsed Once, Evaluated Often
//!
//! Four recognized shapes:
//! - `always`
//! - `key=v1|v2|...` (string equality, OR across alternatives)
//! - `key>n`, `key>=n`, `key<n`, `key<=n` (numeric comparison)
//!
//! Parsing happens once at baseline load so malformed conditions surface as
//! authoring errors, not evaluation-time surprises. Evaluation is total:
//! missing or non-numeric profile data means "not satisfied", never a fault.

use std::fmt;

use thiserror::Error;

use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }

    fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("condition '{0}' matches no recognized form")]
    UnrecognizedForm(String),

    #[error("condition '{0}' is missing a key before the operator")]
    MissingKey(String),

    #[error("condition '{0}' is missing a value after the operator")]
    MissingOperand(String),

    #[error("condition '{0}' compares against a non-numeric literal")]
    NonNumericLiteral(String),
}

/// A parsed applicability condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    Equals { key: String, alternatives: Vec<String> },
    Compare { key: String, op: CmpOp, literal: f64 },
}

/// Outcome of evaluating one condition or a full `when` list.
/// `reasons` is empty iff `matched`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub reasons: Vec<String>,
}

impl ConditionOutcome {
    fn satisfied() -> Self {
        Self { matched: true, reasons: vec![] }
    }

    fn unsatisfied(reason: String) -> Self {
        Self { matched: false, reasons: vec![reason] }
    }
}

// Longer operators must be tried before their one-character prefixes.
const OPERATORS: [(&str, Option<CmpOp>); 5] = [
    (">=", Some(CmpOp::Ge)),
    ("<=", Some(CmpOp::Le)),
    (">", Some(CmpOp::Gt)),
    ("<", Some(CmpOp::Lt)),
    ("=", None),
];

impl Condition {
    pub fn parse(raw: &str) -> Result<Condition, ConditionError> {
        let cond = raw.trim();
        if cond == "always" {
            return Ok(Condition::Always);
        }

        for (symbol, op) in OPERATORS {
            let Some((lhs, rhs)) = cond.split_once(symbol) else {
                continue;
            };
            let key = lhs.trim();
            let rhs = rhs.trim();
            if key.is_empty() {
                return Err(ConditionError::MissingKey(cond.to_string()));
            }
            if rhs.is_empty() {
                return Err(ConditionError::MissingOperand(cond.to_string()));
            }

            return match op {
                Some(op) => {
                    let literal = rhs
                        .parse::<f64>()
                        .map_err(|_| ConditionError::NonNumericLiteral(cond.to_string()))?;
                    Ok(Condition::Compare { key: key.to_string(), op, literal })
                }
                None => Ok(Condition::Equals {
                    key: key.to_string(),
                    alternatives: rhs.split('|').map(|v| v.trim().to_string()).collect(),
                }),
            };
        }

        Err(ConditionError::UnrecognizedForm(cond.to_string()))
    }

    /// Evaluate against a profile. Total: missing attributes and
    /// non-numeric values yield an unmatched outcome with a reason.
    pub fn evaluate(&self, profile: &Profile) -> ConditionOutcome {
        match self {
            Condition::Always => ConditionOutcome::satisfied(),

            Condition::Equals { key, alternatives } => {
                let Some(value) = profile.get(key) else {
                    return ConditionOutcome::unsatisfied(format!(
                        "missing profile value for '{}'",
                        key
                    ));
                };
                let actual = value.normalized();
                if alternatives.iter().any(|alt| *alt == actual) {
                    ConditionOutcome::satisfied()
                } else {
                    ConditionOutcome::unsatisfied(format!(
                        "{}='{}' not in {:?}",
                        key, actual, alternatives
                    ))
                }
            }

            Condition::Compare { key, op, literal } => {
                let Some(value) = profile.get(key) else {
                    return ConditionOutcome::unsatisfied(format!(
                        "missing profile value for '{}'",
                        key
                    ));
                };
                let Some(lhs) = value.as_number() else {
                    return ConditionOutcome::unsatisfied(format!(
                        "non-numeric compare for {} {} {} (value='{}')",
                        key, op, literal, value
                    ));
                };
                if op.holds(lhs, *literal) {
                    ConditionOutcome::satisfied()
                } else {
                    ConditionOutcome::unsatisfied(format!(
                        "{}={} not {} {}",
                        key, lhs, op, literal
                    ))
                }
            }
        }
    }
}

/// AND-fold over a parsed `when` list. An empty list is trivially matched.
pub fn evaluate_when(when: &[Condition], profile: &Profile) -> ConditionOutcome {
    let mut reasons: Vec<String> = vec![];
    for condition in when {
        let outcome = condition.evaluate(profile);
        if !outcome.matched {
            reasons.extend(outcome.reasons);
        }
    }
    ConditionOutcome { matched: reasons.is_empty(), reasons }
}
