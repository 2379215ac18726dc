//! Cardinality factor: fold rare categories of high-cardinality text
//! columns into "Other".

use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    error::Result,
    issue::{Issue, IssueCategory, IssueSeverity},
};

use super::{FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Settings for the cardinality factor.
#[derive(Debug, Clone)]
pub struct CardinalityConfig {
    /// Maximum distinct values allowed in a categorical column before
    /// folding.
    pub max_cardinality: usize,
}

impl Default for CardinalityConfig {
    fn default() -> Self {
        Self {
            max_cardinality: 100,
        }
    }
}

/// High-cardinality detector/fixer.
///
/// A flagged column keeps its `max_cardinality - 1` most frequent
/// categories and folds the rest into "Other", so the folded column
/// (including "Other") never exceeds the limit and re-detection is
/// clean.
pub struct Cardinality;

impl Cardinality {
    /// Categories kept for a column, or `None` when the column is within
    /// the limit. Frequency-ordered, ties broken by first appearance.
    fn kept_categories(
        doc: &TableDocument,
        column: &str,
        max_cardinality: usize,
    ) -> Option<HashSet<String>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for row in doc.rows() {
            let Some(value) = row.get(column) else {
                continue;
            };
            if value.is_missing() {
                continue;
            }
            let key = value.to_display();
            if !counts.contains_key(&key) {
                order.push(key.clone());
            }
            *counts.entry(key).or_insert(0) += 1;
        }
        if counts.len() <= max_cardinality {
            return None;
        }

        let mut ranked: Vec<(usize, String)> = order
            .into_iter()
            .enumerate()
            .map(|(pos, key)| (pos, key))
            .collect();
        ranked.sort_by(|(pos_a, key_a), (pos_b, key_b)| {
            counts[key_b].cmp(&counts[key_a]).then(pos_a.cmp(pos_b))
        });
        Some(
            ranked
                .into_iter()
                .take(max_cardinality.saturating_sub(1))
                .map(|(_, key)| key)
                .collect(),
        )
    }
}

impl QualityFactor for Cardinality {
    fn id(&self) -> FactorId {
        FactorId::Cardinality
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for name in doc.columns_of_type(ColumnType::Text) {
            let Some(kept) =
                Self::kept_categories(doc, &name, config.cardinality.max_cardinality)
            else {
                continue;
            };
            for (i, row) in doc.rows().iter().enumerate() {
                let Some(value) = row.get(&name) else {
                    continue;
                };
                if value.is_missing() {
                    continue;
                }
                let key = value.to_display();
                if !kept.contains(&key) && key != "Other" {
                    issues.push(
                        Issue::flag(
                            i,
                            &name,
                            value.clone(),
                            format!("rare category '{key}' in high-cardinality column"),
                            IssueCategory::DomainError,
                            IssueSeverity::Info,
                        )
                        .with_fix(
                            CellValue::Text("Other".to_string()),
                            "folded into 'Other'",
                        ),
                    );
                }
            }
        }
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let mut fixed = doc.clone();
        let mut modified: Vec<String> = Vec::new();
        let mut log = Vec::new();

        for name in doc.columns_of_type(ColumnType::Text) {
            let Some(kept) =
                Self::kept_categories(doc, &name, config.cardinality.max_cardinality)
            else {
                continue;
            };
            let before: HashSet<String> = doc
                .rows()
                .iter()
                .filter_map(|row| row.get(&name))
                .filter(|v| !v.is_missing())
                .map(CellValue::to_display)
                .collect();
            for i in 0..fixed.num_rows() {
                let Some(value) = fixed.value(i, &name) else {
                    continue;
                };
                if value.is_missing() {
                    continue;
                }
                let key = value.to_display();
                if !kept.contains(&key) && key != "Other" {
                    fixed.set_value(i, &name, CellValue::Text("Other".to_string()))?;
                }
            }
            let after: HashSet<String> = fixed
                .rows()
                .iter()
                .filter_map(|row| row.get(&name))
                .filter(|v| !v.is_missing())
                .map(CellValue::to_display)
                .collect();
            log.push(format!(
                "Reduced cardinality in {} from {} to {}",
                name,
                before.len(),
                after.len()
            ));
            modified.push(name);
        }

        let stats = json!({
            "high_cardinality_columns": modified.len(),
            "columns_modified": modified,
        });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}
