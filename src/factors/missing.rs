//! Missing-value factor: detection and type-aware default imputation.

use serde_json::json;

use crate::{
    document::TableDocument,
    error::Result,
    issue::Issue,
};

use super::{apply_issue_fixes, FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Settings for the missing-value factor.
#[derive(Debug, Clone)]
pub struct MissingConfig {
    /// Columns whose missing ratio exceeds this are dropped instead of
    /// imputed.
    pub max_missing_ratio: f64,
}

impl Default for MissingConfig {
    fn default() -> Self {
        Self {
            max_missing_ratio: 0.5,
        }
    }
}

/// Missing-value detector/fixer.
///
/// Detection flags every missing cell with a type- and name-aware
/// default. The fixer first drops columns that are mostly missing, then
/// imputes the rest.
pub struct MissingValues;

impl QualityFactor for MissingValues {
    fn id(&self) -> FactorId {
        FactorId::MissingValues
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for (i, row) in doc.rows().iter().enumerate() {
            for column in doc.columns() {
                if let Some(value) = row.get(&column.name) {
                    if let Some(issue) = config.rules.check_missing(i, column, value) {
                        issues.push(issue);
                    }
                }
            }
        }
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let before = doc.missing_count();
        let mut log = Vec::new();

        // Drop columns that are mostly missing before imputing the rest.
        let mut dropped: Vec<String> = Vec::new();
        #[allow(clippy::cast_precision_loss)]
        if doc.num_rows() > 0 {
            for column in doc.columns() {
                let missing = doc
                    .rows()
                    .iter()
                    .filter(|row| row.get(&column.name).is_none_or(|v| v.is_missing()))
                    .count();
                let ratio = missing as f64 / doc.num_rows() as f64;
                if ratio > config.missing.max_missing_ratio {
                    dropped.push(column.name.clone());
                }
            }
        }
        let trimmed = if dropped.is_empty() {
            doc.clone()
        } else {
            log.push(format!(
                "Dropped {} columns with >{:.0}% missing values: {:?}",
                dropped.len(),
                config.missing.max_missing_ratio * 100.0,
                dropped
            ));
            doc.without_columns(&dropped.iter().cloned().collect())
        };

        let issues = self.detect(&trimmed, config)?;
        let (fixed, applied) = apply_issue_fixes(&trimmed, &issues, &config.rules)?;
        if applied > 0 {
            log.push(format!(
                "Imputed {applied} missing values with type-aware defaults"
            ));
        }

        let after = fixed.missing_count();
        let stats = json!({
            "before": before,
            "after": after,
            "columns_dropped": dropped.len(),
        });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}
