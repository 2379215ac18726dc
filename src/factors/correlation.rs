//! Feature-correlation factor: detect and remove highly correlated
//! numeric column pairs.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::json;

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    error::Result,
    issue::{Issue, IssueCategory, IssueSeverity},
    stats,
};

use super::{FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Settings for the correlation factor.
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// Absolute Pearson correlation at or above which a pair is flagged.
    pub threshold: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { threshold: 0.9 }
    }
}

/// A flagged pair of correlated columns. Resolution always removes
/// `second` (the later column in declared order), a deterministic
/// tie-break.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedPair {
    /// Earlier column of the pair in declared order.
    pub first: String,
    /// Later column; the one removed on fix.
    pub second: String,
    /// Pearson correlation coefficient.
    pub correlation: f64,
}

/// Pearson-correlation detector/fixer.
pub struct FeatureCorrelation;

impl FeatureCorrelation {
    /// Pairwise Pearson correlation over every pair of numeric columns,
    /// returning pairs with `|r|` at or above `threshold`. Rows where
    /// either side is missing or unparseable are skipped pairwise.
    pub fn correlated_pairs(
        doc: &TableDocument,
        threshold: f64,
    ) -> Result<Vec<CorrelatedPair>> {
        let names = doc.columns_of_type(ColumnType::Numeric);
        let series: Vec<Vec<Option<f64>>> = names
            .iter()
            .map(|name| {
                doc.rows()
                    .iter()
                    .map(|row| match row.get(name.as_str()) {
                        Some(CellValue::Number(n)) if n.is_finite() => Some(*n),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        let mut pairs = Vec::new();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                let (a, b): (Vec<f64>, Vec<f64>) = series[i]
                    .iter()
                    .zip(series[j].iter())
                    .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                    .unzip();
                if let Some(r) = stats::pearson(&a, &b) {
                    if r.abs() >= threshold {
                        pairs.push(CorrelatedPair {
                            first: names[i].clone(),
                            second: names[j].clone(),
                            correlation: r,
                        });
                    }
                }
            }
        }
        Ok(pairs)
    }
}

impl QualityFactor for FeatureCorrelation {
    fn id(&self) -> FactorId {
        FactorId::FeatureCorrelation
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let issues = Self::correlated_pairs(doc, config.correlation.threshold)?
            .into_iter()
            .map(|pair| {
                Issue::flag(
                    0,
                    &pair.second,
                    CellValue::Null,
                    format!(
                        "'{}' correlates with '{}' (r = {:.3})",
                        pair.second, pair.first, pair.correlation
                    ),
                    IssueCategory::LogicalError,
                    IssueSeverity::Info,
                )
            })
            .collect();
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let pairs = Self::correlated_pairs(doc, config.correlation.threshold)?;
        let removed: Vec<String> = {
            let mut seen = HashSet::new();
            pairs
                .iter()
                .filter(|p| seen.insert(p.second.clone()))
                .map(|p| p.second.clone())
                .collect()
        };

        let mut log = Vec::new();
        let document = if removed.is_empty() {
            doc.clone()
        } else {
            log.push(format!(
                "Removed {} highly correlated features: {:?}",
                removed.len(),
                removed
            ));
            doc.without_columns(&removed.iter().cloned().collect())
        };
        let stats = json!({
            "features_removed": removed.len(),
            "removed_features": removed,
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

    fn config(threshold: f64) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.correlation.threshold = threshold;
        config
    }

    #[test]
    fn test_perfectly_correlated_pair_reported() {
        let doc = TableDocument::from_csv_str("a,b\n1,2\n2,4\n3,6\n4,8\n5,10\n").unwrap();
        let pairs = FeatureCorrelation::correlated_pairs(&doc, 0.8).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, "a");
        assert_eq!(pairs[0].second, "b");
        assert!((pairs[0].correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fix_removes_second_column() {
        let doc = TableDocument::from_csv_str("a,b\n1,2\n2,4\n3,6\n4,8\n5,10\n").unwrap();
        let outcome = FeatureCorrelation.fix(&doc, &config(0.8)).unwrap();
        assert!(outcome.document.has_column("a"));
        assert!(!outcome.document.has_column("b"));
        assert_eq!(outcome.stats["removed_features"][0], "b");
    }

    #[test]
    fn test_uncorrelated_columns_kept() {
        let doc = TableDocument::from_csv_str("a,b\n1,9\n2,1\n3,8\n4,2\n5,5\n").unwrap();
        let outcome = FeatureCorrelation.fix(&doc, &config(0.9)).unwrap();
        assert_eq!(outcome.document.num_columns(), 2);
        assert_eq!(outcome.stats["features_removed"], 0);
    }

    #[test]
    fn test_negative_correlation_flagged() {
        let doc =
            TableDocument::from_csv_str("a,b\n1,-2\n2,-4\n3,-6\n4,-8\n5,-10\n").unwrap();
        let pairs = FeatureCorrelation::correlated_pairs(&doc, 0.8).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].correlation < -0.99);
    }

    #[test]
    fn test_idempotent_removal() {
        // b and c both track a; removing the later column of each flagged
        // pair leaves no pair at or above the threshold.
        let doc = TableDocument::from_csv_str(
            "a,b,c\n1,2,3\n2,4,6\n3,6,9\n4,8,12\n5,10,15\n",
        )
        .unwrap();
        let cfg = config(0.8);
        let once = FeatureCorrelation.fix(&doc, &cfg).unwrap().document;
        assert_eq!(once.column_names(), vec!["a"]);
        assert!(FeatureCorrelation.detect(&once, &cfg).unwrap().is_empty());
    }
}
