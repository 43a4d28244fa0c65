//! Summary Reporting - Tabular Exports
//!
//! Rolls a generated instance's findings up by (severity, category) and
//! writes the row-oriented exports: aggregated report, row-per-finding,
//! row-per-requirement.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::RequirementsInstance;
use crate::validation::{FindingCategory, OverallStatus, Severity};

const MAX_MESSAGE_EXAMPLES: usize = 3;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportCounts {
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub finding_count: usize,
}

/// One (severity, category) group: how often it fired, which requirements
/// it touched, and up to three example messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRollup {
    pub severity: Severity,
    pub category: FindingCategory,
    pub count: usize,
    pub requirement_ids: Vec<String>,
    pub message_examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub instance_id: String,
    pub library_id: String,
    pub component: String,
    pub generated_utc: DateTime<Utc>,
    pub overall_status: OverallStatus,
    pub counts: ReportCounts,
    pub by_category: Vec<CategoryRollup>,
}

/// Build the compact summary report, groups ordered by severity rank then
/// category name.
pub fn build_report(instance: &RequirementsInstance) -> SummaryReport {
    struct Group {
        severity: Severity,
        category: FindingCategory,
        count: usize,
        requirement_ids: BTreeSet<String>,
        message_examples: Vec<String>,
    }

    let mut grouped: BTreeMap<(u8, &'static str), Group> = BTreeMap::new();

    for finding in &instance.validation.findings {
        let key = (finding.severity.rank(), finding.category.as_str());
        let group = grouped.entry(key).or_insert_with(|| Group {
            severity: finding.severity,
            category: finding.category,
            count: 0,
            requirement_ids: BTreeSet::new(),
            message_examples: vec![],
        });

        group.count += 1;
        if let Some(id) = &finding.requirement_id {
            group.requirement_ids.insert(id.clone());
        }
        if group.message_examples.len() < MAX_MESSAGE_EXAMPLES {
            group.message_examples.push(finding.message.clone());
        }
    }

    SummaryReport {
        instance_id: instance.instance_id.clone(),
        library_id: instance.library_id.clone(),
        component: instance.component.clone(),
        generated_utc: instance.generated_utc,
        overall_status: instance.validation.overall_status,
        counts: ReportCounts {
            error_count: instance.validation.error_count,
            warning_count: instance.validation.warning_count,
            info_count: instance.validation.info_count,
            finding_count: instance.validation.finding_count,
        },
        by_category: grouped
            .into_values()
            .map(|g| CategoryRollup {
                severity: g.severity,
                category: g.category,
                count: g.count,
                requirement_ids: g.requirement_ids.into_iter().collect(),
                message_examples: g.message_examples,
            })
            .collect(),
    }
}

pub fn write_report_json(report: &SummaryReport, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// Aggregated CSV: one row per (severity, category) group.
pub fn write_report_csv(report: &SummaryReport, path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["severity", "category", "count", "requirement_ids", "message_examples"])?;
    for row in &report.by_category {
        let count = row.count.to_string();
        let ids = row.requirement_ids.join(";");
        let examples = row.message_examples.join(" | ");
        writer.write_record([
            row.severity.as_str(),
            row.category.as_str(),
            count.as_str(),
            ids.as_str(),
            examples.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Row-per-finding CSV, in validation order.
pub fn write_findings_csv(
    instance: &RequirementsInstance,
    path: &Path,
) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["requirement_id", "severity", "category", "message"])?;
    for finding in &instance.validation.findings {
        writer.write_record([
            finding.requirement_id.as_deref().unwrap_or(""),
            finding.severity.as_str(),
            finding.category.as_str(),
            finding.message.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Row-per-requirement CSV covering both partitions, baseline order.
pub fn write_requirements_csv(
    instance: &RequirementsInstance,
    path: &Path,
) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["id", "applicable", "status", "type", "tbd_parameters", "conditions"])?;
    for req in &instance.applicable_requirements {
        let tbd = req.tbd_parameters.join(";");
        let conditions = req.applicability.conditions.join("; ");
        writer.write_record([
            req.id.as_str(),
            "true",
            req.status.as_str(),
            req.req_type.as_str(),
            tbd.as_str(),
            conditions.as_str(),
        ])?;
    }
    for req in &instance.non_applicable_requirements {
        let conditions = req.conditions.join("; ");
        writer.write_record([req.id.as_str(), "false", "", "", "", conditions.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
