//! Low-variance factor: remove near-constant columns.

use std::collections::HashSet;

use serde_json::json;

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    error::Result,
    issue::{Issue, IssueCategory, IssueSeverity},
    stats,
};

use super::{FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Settings for the low-variance factor.
#[derive(Debug, Clone)]
pub struct VarianceConfig {
    /// Numeric columns with population variance below this are removed.
    pub variance_threshold: f64,
    /// Categorical columns with a distinct-value ratio below this are
    /// removed. Independent of the numeric threshold.
    pub unique_ratio_threshold: f64,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 0.01,
            unique_ratio_threshold: 0.05,
        }
    }
}

/// Low-variance detector/fixer.
pub struct LowVariance;

impl LowVariance {
    /// Columns flagged for removal with the measure that flagged them.
    fn flagged_columns(
        doc: &TableDocument,
        config: &PipelineConfig,
    ) -> Result<Vec<(String, String)>> {
        let mut flagged = Vec::new();

        for name in doc.columns_of_type(ColumnType::Numeric) {
            let values = doc.numeric_values(&name)?;
            if values.len() < 2 {
                continue;
            }
            if let Some(var) = stats::variance(&values) {
                if var < config.variance.variance_threshold {
                    flagged.push((
                        name,
                        format!(
                            "variance {:.6} below {}",
                            var, config.variance.variance_threshold
                        ),
                    ));
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        for name in doc.columns_of_type(ColumnType::Text) {
            let non_missing: Vec<String> = doc
                .rows()
                .iter()
                .filter_map(|row| row.get(&name))
                .filter(|v| !v.is_missing())
                .map(CellValue::to_display)
                .collect();
            if non_missing.len() < 2 {
                continue;
            }
            let distinct: HashSet<&String> = non_missing.iter().collect();
            let ratio = distinct.len() as f64 / non_missing.len() as f64;
            if ratio < config.variance.unique_ratio_threshold {
                flagged.push((
                    name,
                    format!(
                        "distinct ratio {:.4} below {}",
                        ratio, config.variance.unique_ratio_threshold
                    ),
                ));
            }
        }

        Ok(flagged)
    }
}

impl QualityFactor for LowVariance {
    fn id(&self) -> FactorId {
        FactorId::LowVariance
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let issues = Self::flagged_columns(doc, config)?
            .into_iter()
            .map(|(name, reason)| {
                Issue::flag(
                    0,
                    &name,
                    CellValue::Null,
                    format!("column '{name}' carries almost no information ({reason})"),
                    IssueCategory::LogicalError,
                    IssueSeverity::Info,
                )
            })
            .collect();
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let flagged = Self::flagged_columns(doc, config)?;
        let names: Vec<String> = flagged.iter().map(|(name, _)| name.clone()).collect();
        let mut log = Vec::new();
        let document = if names.is_empty() {
            doc.clone()
        } else {
            log.push(format!(
                "Removed {} low variance features: {:?}",
                names.len(),
                names
            ));
            doc.without_columns(&names.iter().cloned().collect())
        };
        let stats = json!({
            "features_removed": names.len(),
            "removed_features": names,
        });
        Ok(FactorOutcome {
            document,
            stats,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_numeric_column_removed() {
        let doc =
            TableDocument::from_csv_str("flat,varied\n5,1\n5,9\n5,4\n5,7\n").unwrap();
        let outcome = LowVariance.fix(&doc, &PipelineConfig::default()).unwrap();
        assert!(!outcome.document.has_column("flat"));
        assert!(outcome.document.has_column("varied"));
        assert_eq!(outcome.stats["features_removed"], 1);
        assert_eq!(outcome.stats["removed_features"][0], "flat");
    }

    #[test]
    fn test_low_unique_ratio_text_column_removed() {
        // 40 rows of a single category: ratio 1/40 = 0.025 < 0.05
        let mut csv = String::from("label\n");
        for _ in 0..40 {
            csv.push_str("same\n");
        }
        let doc = TableDocument::from_csv_str(&csv).unwrap();
        let outcome = LowVariance.fix(&doc, &PipelineConfig::default()).unwrap();
        assert!(!outcome.document.has_column("label"));
    }

    #[test]
    fn test_varied_columns_kept() {
        let doc = TableDocument::from_csv_str("v,name\n1,ana\n9,bo\n4,cy\n").unwrap();
        let outcome = LowVariance.fix(&doc, &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.document.num_columns(), 2);
        assert_eq!(outcome.stats["features_removed"], 0);
    }

    #[test]
    fn test_idempotent() {
        let doc = TableDocument::from_csv_str("flat,varied\n5,1\n5,9\n5,4\n").unwrap();
        let config = PipelineConfig::default();
        let once = LowVariance.fix(&doc, &config).unwrap().document;
        assert!(LowVariance.detect(&once, &config).unwrap().is_empty());
    }
}
