//! Outlier factor: IQR detection with median replacement.
//!
//! The heavier isolation-forest treatment is delegated to the external
//! compute service; this factor is the local, deterministic rule.

use serde_json::json;

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    error::Result,
    issue::{Issue, IssueCategory, IssueSeverity},
    stats,
};

use super::{apply_issue_fixes, FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Settings for the outlier factor.
#[derive(Debug, Clone)]
pub struct OutlierConfig {
    /// IQR multiplier for the fences (1.5 is the classic Tukey rule).
    pub iqr_multiplier: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self { iqr_multiplier: 1.5 }
    }
}

/// IQR outlier detector/fixer.
pub struct Outliers;

impl QualityFactor for Outliers {
    fn id(&self) -> FactorId {
        FactorId::Outliers
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for name in doc.columns_of_type(ColumnType::Numeric) {
            let values = doc.numeric_values(&name)?;
            let Some((q1, q3)) = stats::quartiles(&values) else {
                continue;
            };
            let iqr = q3 - q1;
            let lower = q1 - config.outliers.iqr_multiplier * iqr;
            let upper = q3 + config.outliers.iqr_multiplier * iqr;
            let Some(median) = stats::median(&values) else {
                continue;
            };

            for (i, row) in doc.rows().iter().enumerate() {
                if let Some(CellValue::Number(n)) = row.get(&name) {
                    if *n < lower || *n > upper {
                        issues.push(
                            Issue::flag(
                                i,
                                &name,
                                CellValue::Number(*n),
                                format!(
                                    "{n} is outside the IQR fences [{lower:.3}, {upper:.3}]"
                                ),
                                IssueCategory::RangeError,
                                IssueSeverity::Warning,
                            )
                            .with_fix(
                                CellValue::Number(median),
                                format!("replaced with column median {median}"),
                            ),
                        );
                    }
                }
            }
        }
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let issues = self.detect(doc, config)?;
        let (fixed, applied) = apply_issue_fixes(doc, &issues, &config.rules)?;
        let mut log = Vec::new();
        if applied > 0 {
            log.push(format!(
                "Replaced {applied} outlier values with column medians"
            ));
        }
        let stats = json!({
            "outliers_detected": applied,
            "method": "iqr",
        });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}
