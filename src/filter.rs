//! Applicability Filter - Stable Partition
//!
//! Splits a compiled library into applicable and non-applicable
//! requirements for one profile, preserving baseline order on both sides.

use serde::{Deserialize, Serialize};

use crate::conditions::evaluate_when;
use crate::library::{CompiledLibrary, CompiledRequirement};
use crate::profile::Profile;

/// A requirement excluded by its `when` conditions, with the raw condition
/// strings and the reasons they did not hold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NonApplicableRequirement {
    pub id: String,
    pub conditions: Vec<String>,
    pub reasons: Vec<String>,
}

#[derive(Debug)]
pub struct Partition<'a> {
    pub applicable: Vec<&'a CompiledRequirement>,
    pub non_applicable: Vec<NonApplicableRequirement>,
}

/// Partition a library against a profile. The library is read-only input;
/// the same compiled library can serve concurrent runs.
pub fn partition<'a>(library: &'a CompiledLibrary, profile: &Profile) -> Partition<'a> {
    let mut applicable: Vec<&CompiledRequirement> = vec![];
    let mut non_applicable: Vec<NonApplicableRequirement> = vec![];

    for compiled in &library.requirements {
        let outcome = evaluate_when(&compiled.when, profile);
        if outcome.matched {
            applicable.push(compiled);
        } else {
            non_applicable.push(NonApplicableRequirement {
                id: compiled.requirement.id.clone(),
                conditions: compiled.requirement.applicability.when.clone(),
                reasons: outcome.reasons,
            });
        }
    }

    Partition { applicable, non_applicable }
}
