//! Duplicate-record factor: composite-key deduplication.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    document::TableDocument,
    error::{Error, Result},
    issue::{Issue, IssueCategory, IssueSeverity},
};

use super::{FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Separator joining key parts. The CSV boundary cannot deliver this
/// control character inside a field, so keys never collide with data.
const KEY_SEPARATOR: char = '\u{1F}';

/// Which occurrence of a duplicate key survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keep {
    /// Keep the first occurrence (scan order).
    #[default]
    First,
    /// Keep the last occurrence.
    Last,
}

/// Settings for the duplicate factor.
#[derive(Debug, Clone, Default)]
pub struct DuplicateConfig {
    /// Columns forming the composite key, in the caller's order.
    /// `None` means all columns in declared order.
    pub subset: Option<Vec<String>>,
    /// Which occurrence survives.
    pub keep: Keep,
}

/// Duplicate detector/fixer over a composite key.
///
/// Single scan (reversed for [`Keep::Last`]) with a seen-set of keys:
/// O(n·k) time, O(n) extra space.
pub struct Duplicates;

impl Duplicates {
    fn key_columns<'a>(
        doc: &'a TableDocument,
        config: &'a PipelineConfig,
    ) -> Result<Vec<&'a str>> {
        match &config.duplicates.subset {
            Some(subset) => {
                for name in subset {
                    if !doc.has_column(name) {
                        return Err(Error::column_not_found(name));
                    }
                }
                Ok(subset.iter().map(String::as_str).collect())
            }
            None => Ok(doc.column_names()),
        }
    }

    fn row_key(doc: &TableDocument, row: usize, columns: &[&str]) -> String {
        let mut key = String::new();
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            if let Some(value) = doc.value(row, column) {
                key.push_str(&value.to_display());
            }
        }
        key
    }

    /// Row indices that survive deduplication, in original order.
    fn retained_indices(
        doc: &TableDocument,
        columns: &[&str],
        keep: Keep,
    ) -> Vec<usize> {
        let n = doc.num_rows();
        let mut seen: HashSet<String> = HashSet::with_capacity(n);
        let mut retained = Vec::with_capacity(n);
        match keep {
            Keep::First => {
                for i in 0..n {
                    if seen.insert(Self::row_key(doc, i, columns)) {
                        retained.push(i);
                    }
                }
            }
            Keep::Last => {
                for i in (0..n).rev() {
                    if seen.insert(Self::row_key(doc, i, columns)) {
                        retained.push(i);
                    }
                }
                retained.reverse();
            }
        }
        retained
    }
}

impl QualityFactor for Duplicates {
    fn id(&self) -> FactorId {
        FactorId::Duplicates
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let columns = Self::key_columns(doc, config)?;
        let retained: HashSet<usize> =
            Self::retained_indices(doc, &columns, config.duplicates.keep)
                .into_iter()
                .collect();
        let anchor = columns.first().copied().unwrap_or_default();

        let issues = (0..doc.num_rows())
            .filter(|i| !retained.contains(i))
            .map(|i| {
                let value = doc.value(i, anchor).cloned().unwrap_or_default();
                Issue::flag(
                    i,
                    anchor,
                    value,
                    format!("row {i} duplicates an existing composite key"),
                    IssueCategory::LogicalError,
                    IssueSeverity::Info,
                )
            })
            .collect();
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let columns = Self::key_columns(doc, config)?;
        let retained = Self::retained_indices(doc, &columns, config.duplicates.keep);

        let before = doc.num_rows();
        let rows = retained
            .iter()
            .filter_map(|&i| doc.row(i).cloned())
            .collect();
        let deduped = doc.with_rows(rows);
        let after = deduped.num_rows();
        let removed = before - after;

        let mut log = Vec::new();
        if removed > 0 {
            log.push(format!("Removed {removed} duplicate records"));
        }
        let stats = json!({
            "before_count": before,
            "after_count": after,
            "removed": removed,
        });
        Ok(FactorOutcome {
            document: deduped,
            stats,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CellValue;

    fn doc() -> TableDocument {
        TableDocument::from_csv_str("id,name\n1,ana\n2,bo\n1,ana\n3,cy\n2,bo\n").unwrap()
    }

    #[test]
    fn test_keep_first_retains_first_occurrence() {
        let outcome = Duplicates.fix(&doc(), &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.document.num_rows(), 3);
        assert_eq!(outcome.stats["removed"], 2);
        let ids: Vec<f64> = (0..3)
            .map(|i| outcome.document.value(i, "id").unwrap().as_number().unwrap())
            .collect();
        assert_eq!(ids, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_keep_last_preserves_relative_order() {
        let mut config = PipelineConfig::default();
        config.duplicates.keep = Keep::Last;
        let outcome = Duplicates.fix(&doc(), &config).unwrap();
        // last occurrences: row 2 (1,ana), row 3 (3,cy), row 4 (2,bo)
        let ids: Vec<f64> = (0..3)
            .map(|i| outcome.document.value(i, "id").unwrap().as_number().unwrap())
            .collect();
        assert_eq!(ids, vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_output_length_equals_distinct_keys() {
        let outcome = Duplicates.fix(&doc(), &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.document.num_rows(), 3);
    }

    #[test]
    fn test_subset_key() {
        let mut config = PipelineConfig::default();
        config.duplicates.subset = Some(vec!["name".to_string()]);
        let doc =
            TableDocument::from_csv_str("id,name\n1,ana\n2,ana\n3,bo\n").unwrap();
        let outcome = Duplicates.fix(&doc, &config).unwrap();
        assert_eq!(outcome.document.num_rows(), 2);
        assert_eq!(
            outcome.document.value(0, "id"),
            Some(&CellValue::Number(1.0))
        );
    }

    #[test]
    fn test_unknown_subset_column_errors() {
        let mut config = PipelineConfig::default();
        config.duplicates.subset = Some(vec!["nope".to_string()]);
        assert!(Duplicates.fix(&doc(), &config).is_err());
    }

    #[test]
    fn test_detect_flags_non_retained_rows() {
        let issues = Duplicates.detect(&doc(), &PipelineConfig::default()).unwrap();
        let rows: Vec<usize> = issues.iter().map(|i| i.row_index).collect();
        assert_eq!(rows, vec![2, 4]);
        assert!(issues.iter().all(|i| i.severity == IssueSeverity::Info));
    }

    #[test]
    fn test_idempotent() {
        let config = PipelineConfig::default();
        let once = Duplicates.fix(&doc(), &config).unwrap().document;
        assert!(Duplicates.detect(&once, &config).unwrap().is_empty());
    }
}
