//! Range-violation factor: per-column bounds with clip, remove, or
//! nullify actions.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    error::Result,
    issue::{Issue, IssueCategory, IssueSeverity},
    stats,
};

use super::{FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// What to do with a value outside its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeAction {
    /// Clamp the value into the range.
    #[default]
    Clip,
    /// Remove the whole row.
    RemoveRow,
    /// Replace the value with null.
    Nullify,
}

/// A per-column range rule. Missing bounds are unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    /// Inclusive lower bound.
    pub min: Option<f64>,
    /// Inclusive upper bound.
    pub max: Option<f64>,
    /// Action taken on violation.
    #[serde(default)]
    pub action: RangeAction,
}

impl RangeRule {
    /// Rule clipping into `[min, max]`.
    pub fn clip(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            action: RangeAction::Clip,
        }
    }

    fn violates(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max)
    }

    fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }
}

/// Settings for the range factor.
#[derive(Debug, Clone)]
pub struct RangeConfig {
    /// Explicit per-column rules, keyed by column name.
    pub rules: HashMap<String, RangeRule>,
    /// Derive mean ± `sigma`·std bounds for numeric columns without an
    /// explicit rule.
    pub auto_bounds: bool,
    /// Standard-deviation multiplier for derived bounds.
    pub sigma: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            auto_bounds: true,
            sigma: 3.0,
        }
    }
}

/// Range-violation detector/fixer.
pub struct RangeViolations;

impl RangeViolations {
    /// The rule in effect for a column: explicit, or seeded at
    /// mean ± sigma·std when auto-bounds are on.
    fn effective_rule(
        doc: &TableDocument,
        column: &str,
        config: &PipelineConfig,
    ) -> Result<Option<RangeRule>> {
        if let Some(rule) = config.range.rules.get(column) {
            return Ok(Some(*rule));
        }
        if !config.range.auto_bounds {
            return Ok(None);
        }
        let values = doc.numeric_values(column)?;
        if values.len() < 2 {
            return Ok(None);
        }
        let (Some(mean), Some(std)) = (stats::mean(&values), stats::std_dev(&values)) else {
            return Ok(None);
        };
        if std == 0.0 {
            return Ok(None);
        }
        Ok(Some(RangeRule {
            min: Some(mean - config.range.sigma * std),
            max: Some(mean + config.range.sigma * std),
            action: RangeAction::Clip,
        }))
    }
}

impl QualityFactor for RangeViolations {
    fn id(&self) -> FactorId {
        FactorId::RangeViolations
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for name in doc.columns_of_type(ColumnType::Numeric) {
            let Some(rule) = Self::effective_rule(doc, &name, config)? else {
                continue;
            };
            for (i, row) in doc.rows().iter().enumerate() {
                let Some(CellValue::Number(n)) = row.get(&name) else {
                    continue;
                };
                if !rule.violates(*n) {
                    continue;
                }
                let base = Issue::flag(
                    i,
                    &name,
                    CellValue::Number(*n),
                    format!(
                        "{} is outside the allowed range [{}, {}]",
                        n,
                        rule.min.map_or("-inf".to_string(), |v| format!("{v:.3}")),
                        rule.max.map_or("+inf".to_string(), |v| format!("{v:.3}")),
                    ),
                    IssueCategory::RangeError,
                    IssueSeverity::Warning,
                );
                let issue = match rule.action {
                    RangeAction::Clip => {
                        let clamped = rule.clamp(*n);
                        base.with_fix(
                            CellValue::Number(clamped),
                            format!("clipped to {clamped}"),
                        )
                    }
                    RangeAction::Nullify => {
                        base.with_fix(CellValue::Null, "value nulled for later imputation")
                    }
                    RangeAction::RemoveRow => base,
                };
                issues.push(issue);
            }
        }
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let mut fixed = doc.clone();
        let mut violations = 0usize;
        let mut rows_to_remove: HashSet<usize> = HashSet::new();
        let mut per_column: HashMap<String, usize> = HashMap::new();

        for name in doc.columns_of_type(ColumnType::Numeric) {
            let Some(rule) = Self::effective_rule(doc, &name, config)? else {
                continue;
            };
            for i in 0..doc.num_rows() {
                let Some(CellValue::Number(n)) = doc.value(i, &name) else {
                    continue;
                };
                if !rule.violates(*n) {
                    continue;
                }
                violations += 1;
                *per_column.entry(name.clone()).or_insert(0) += 1;
                match rule.action {
                    RangeAction::Clip => {
                        fixed.set_value(i, &name, CellValue::Number(rule.clamp(*n)))?;
                    }
                    RangeAction::Nullify => {
                        fixed.set_value(i, &name, CellValue::Null)?;
                    }
                    RangeAction::RemoveRow => {
                        rows_to_remove.insert(i);
                    }
                }
            }
        }

        let rows_removed = rows_to_remove.len();
        if rows_removed > 0 {
            let rows = fixed
                .rows()
                .iter()
                .enumerate()
                .filter(|(i, _)| !rows_to_remove.contains(i))
                .map(|(_, row)| row.clone())
                .collect();
            fixed = fixed.with_rows(rows);
        }

        let mut log: Vec<String> = per_column
            .iter()
            .map(|(name, count)| format!("Fixed {count} range violations in {name}"))
            .collect();
        log.sort();
        if rows_removed > 0 {
            log.push(format!("Removed {rows_removed} rows with range violations"));
        }

        let stats = json!({
            "violations_fixed": violations,
            "rows_removed": rows_removed,
        });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_rule(column: &str, rule: RangeRule) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.range.auto_bounds = false;
        config.range.rules.insert(column.to_string(), rule);
        config
    }

    #[test]
    fn test_clip_action() {
        let doc = TableDocument::from_csv_str("v\n-5\n3\n15\n").unwrap();
        let config = with_rule("v", RangeRule::clip(0.0, 10.0));
        let outcome = RangeViolations.fix(&doc, &config).unwrap();
        let values = outcome.document.numeric_values("v").unwrap();
        assert_eq!(values, vec![0.0, 3.0, 10.0]);
        assert_eq!(outcome.stats["violations_fixed"], 2);
    }

    #[test]
    fn test_remove_row_action() {
        let doc = TableDocument::from_csv_str("v,id\n-5,1\n3,2\n15,3\n").unwrap();
        let config = with_rule(
            "v",
            RangeRule {
                min: Some(0.0),
                max: Some(10.0),
                action: RangeAction::RemoveRow,
            },
        );
        let outcome = RangeViolations.fix(&doc, &config).unwrap();
        assert_eq!(outcome.document.num_rows(), 1);
        assert_eq!(
            outcome.document.value(0, "id"),
            Some(&CellValue::Number(2.0))
        );
        assert_eq!(outcome.stats["rows_removed"], 2);
    }

    #[test]
    fn test_nullify_action() {
        let doc = TableDocument::from_csv_str("v\n-5\n3\n").unwrap();
        let config = with_rule(
            "v",
            RangeRule {
                min: Some(0.0),
                max: None,
                action: RangeAction::Nullify,
            },
        );
        let outcome = RangeViolations.fix(&doc, &config).unwrap();
        assert_eq!(outcome.document.value(0, "v"), Some(&CellValue::Null));
    }

    #[test]
    fn test_auto_bounds_clip_extremes() {
        let mut csv = String::from("v\n");
        for _ in 0..30 {
            csv.push_str("10\n11\n9\n");
        }
        csv.push_str("1000\n");
        let doc = TableDocument::from_csv_str(&csv).unwrap();
        let outcome = RangeViolations
            .fix(&doc, &PipelineConfig::default())
            .unwrap();
        let max = outcome
            .document
            .numeric_values("v")
            .unwrap()
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(max < 1000.0);
        assert!(outcome.stats["violations_fixed"].as_u64().unwrap() >= 1);
    }

    #[test]
    fn test_explicit_rule_idempotent() {
        let doc = TableDocument::from_csv_str("v\n-5\n3\n15\n").unwrap();
        let config = with_rule("v", RangeRule::clip(0.0, 10.0));
        let once = RangeViolations.fix(&doc, &config).unwrap().document;
        assert!(RangeViolations.detect(&once, &config).unwrap().is_empty());
    }

    #[test]
    fn test_one_sided_rule() {
        let rule = RangeRule {
            min: None,
            max: Some(10.0),
            action: RangeAction::Clip,
        };
        assert!(!rule.violates(-1000.0));
        assert!(rule.violates(10.5));
        assert_eq!(rule.clamp(10.5), 10.0);
    }
}
