//! Instantiator - Single-Pass Placeholder Substitution
//!
//! Replaces `{{param}}` tokens in every templated field with profile
//! values. Missing values never fail instantiation: the placeholder stays
//! in the text and the key is recorded as a TBD parameter for tracking.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::library::{Requirement, Verification};
use crate::profile::{AttributeValue, Profile};

pub(crate) static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}").unwrap());

/// Instance lifecycle: `review_required` iff any parameter is TBD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Draft,
    ReviewRequired,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Draft => "draft",
            InstanceStatus::ReviewRequired => "review_required",
        }
    }
}

/// The conditions a requirement carried, plus the match outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedConditions {
    pub conditions: Vec<String>,
    pub matched: bool,
}

/// A catalog requirement with placeholders resolved against one profile.
/// `id` is the originating catalog identifier, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantiatedRequirement {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub req_type: String,
    pub verification: Verification,
    #[serde(default)]
    pub provenance_refs: Vec<String>,
    pub status: InstanceStatus,
    #[serde(default)]
    pub parameter_values: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub tbd_parameters: Vec<String>,
    pub applicability: AppliedConditions,
}

#[derive(Default)]
struct Substitution {
    used: BTreeMap<String, AttributeValue>,
    tbd: Vec<String>,
}

impl Substitution {
    /// Single pass: substituted values are not re-scanned, so a value that
    /// itself contains `{{...}}` cannot trigger recursive substitution.
    fn render(&mut self, text: &str, profile: &Profile) -> String {
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures| {
                let key = &caps[1];
                match profile.get(key) {
                    Some(value) => {
                        self.used.insert(key.to_string(), value.clone());
                        value.to_string()
                    }
                    None => {
                        if !self.tbd.iter().any(|k| k == key) {
                            self.tbd.push(key.to_string());
                        }
                        format!("{{{{{}}}}}", key)
                    }
                }
            })
            .into_owned()
    }
}

/// Instantiate one applicable requirement against a profile.
pub fn instantiate(requirement: &Requirement, profile: &Profile) -> InstantiatedRequirement {
    let mut substitution = Substitution::default();

    let text = substitution.render(&requirement.text, profile);
    let method = requirement
        .verification
        .method
        .iter()
        .map(|m| substitution.render(m, profile))
        .collect();
    let acceptance = substitution.render(&requirement.verification.acceptance, profile);

    let status = if substitution.tbd.is_empty() {
        InstanceStatus::Draft
    } else {
        InstanceStatus::ReviewRequired
    };

    InstantiatedRequirement {
        id: requirement.id.clone(),
        text,
        req_type: requirement.req_type.clone(),
        verification: Verification { method, acceptance },
        provenance_refs: requirement.provenance_refs.clone(),
        status,
        parameter_values: substitution.used,
        tbd_parameters: substitution.tbd,
        applicability: AppliedConditions {
            conditions: requirement.applicability.when.clone(),
            matched: true,
        },
    }
}
