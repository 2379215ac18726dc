//! Quality metrics and the 0-100 weighted score.

// Statistical computation requires usize->f64 casts
#![allow(clippy::cast_precision_loss)]

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    stats,
};

/// Score returned when no metric is present (zero total weight).
pub const FALLBACK_SCORE: u8 = 50;

/// Flat record of dataset quality metrics.
///
/// Every metric is optional; the scorer averages over whatever is
/// present. Field names serialize to the wire form (`Missing_Values_Pct`
/// and friends) consumed by dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Missing cells as a percentage of all cells (0-100).
    #[serde(rename = "Missing_Values_Pct")]
    pub missing_values_pct: Option<f64>,
    /// Count of fully duplicated rows.
    #[serde(rename = "Duplicate_Records_Count")]
    pub duplicate_records_count: Option<f64>,
    /// Share of numeric cells flagged as outliers (0-1).
    #[serde(rename = "Outlier_Rate")]
    pub outlier_rate: Option<f64>,
    /// Share of columns with internally inconsistent content (0-1).
    #[serde(rename = "Inconsistency_Rate")]
    pub inconsistency_rate: Option<f64>,
    /// Share of cells that fail declared-type coercion (0-1).
    #[serde(rename = "Data_Type_Mismatch_Rate")]
    pub data_type_mismatch_rate: Option<f64>,
    /// Mean absolute pairwise Pearson correlation (0-1).
    #[serde(rename = "Feature_Correlation_Mean")]
    pub feature_correlation_mean: Option<f64>,
    /// Share of numeric values outside mean ± 3·std (0-1).
    #[serde(rename = "Range_Violation_Rate")]
    pub range_violation_rate: Option<f64>,
    /// Mean `|mean - median| / std` over numeric columns.
    #[serde(rename = "Mean_Median_Drift")]
    pub mean_median_drift: Option<f64>,
    /// Mean distinct-value count over categorical columns.
    #[serde(rename = "Cardinality_Categorical")]
    pub cardinality_categorical: Option<f64>,
}

/// Fixed weights per metric; they sum to 1 across the nine tracked
/// metrics.
const WEIGHTS: [(fn(&QualityMetrics) -> Option<f64>, f64); 9] = [
    (normalized_missing, 0.20),
    (normalized_duplicates, 0.10),
    (normalized_outliers, 0.15),
    (normalized_inconsistency, 0.10),
    (normalized_mismatch, 0.10),
    (normalized_correlation, 0.10),
    (normalized_range, 0.10),
    (normalized_drift, 0.05),
    (normalized_cardinality, 0.10),
];

fn linear(value: f64, normalizer: f64) -> f64 {
    (1.0 - value / normalizer).max(0.0)
}

fn normalized_missing(m: &QualityMetrics) -> Option<f64> {
    m.missing_values_pct.map(|v| linear(v, 30.0))
}

fn normalized_duplicates(m: &QualityMetrics) -> Option<f64> {
    m.duplicate_records_count.map(|v| linear(v, 100.0))
}

fn normalized_outliers(m: &QualityMetrics) -> Option<f64> {
    m.outlier_rate.map(|v| linear(v, 0.15))
}

fn normalized_inconsistency(m: &QualityMetrics) -> Option<f64> {
    m.inconsistency_rate.map(|v| linear(v, 0.1))
}

fn normalized_mismatch(m: &QualityMetrics) -> Option<f64> {
    m.data_type_mismatch_rate.map(|v| linear(v, 0.05))
}

/// Two-sided map peaking at correlation 0.5: some shared signal is
/// healthy, redundancy is not.
fn normalized_correlation(m: &QualityMetrics) -> Option<f64> {
    m.feature_correlation_mean.map(|c| {
        let n = if c <= 0.5 { c * 2.0 } else { 2.0 - c * 2.0 };
        n.clamp(0.0, 1.0)
    })
}

fn normalized_range(m: &QualityMetrics) -> Option<f64> {
    m.range_violation_rate.map(|v| linear(v, 0.1))
}

fn normalized_drift(m: &QualityMetrics) -> Option<f64> {
    m.mean_median_drift.map(|v| linear(v, 0.2))
}

fn normalized_cardinality(m: &QualityMetrics) -> Option<f64> {
    m.cardinality_categorical.map(|v| (v / 50.0).min(1.0))
}

impl QualityMetrics {
    /// Weight-normalized weighted average of the present metrics,
    /// scaled to 0-100 and rounded. Returns [`FALLBACK_SCORE`] when no
    /// metric is present.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn score(&self) -> u8 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (normalize, weight) in WEIGHTS {
            if let Some(n) = normalize(self) {
                weighted += n * weight;
                total_weight += weight;
            }
        }
        if total_weight == 0.0 {
            return FALLBACK_SCORE;
        }
        (100.0 * weighted / total_weight).round().clamp(0.0, 100.0) as u8
    }

    /// Compute all metrics directly from a document.
    pub fn from_document(doc: &TableDocument) -> Self {
        let (rows, cols) = doc.shape();
        let total_cells = rows * cols;

        let missing_values_pct = (total_cells > 0)
            .then(|| doc.missing_count() as f64 / total_cells as f64 * 100.0);

        let duplicate_records_count = (rows > 0).then(|| {
            let mut seen: HashSet<String> = HashSet::with_capacity(rows);
            let names = doc.column_names();
            let mut duplicates = 0usize;
            for i in 0..rows {
                let key: Vec<String> = names
                    .iter()
                    .map(|name| {
                        doc.value(i, name).map(CellValue::to_display).unwrap_or_default()
                    })
                    .collect();
                if !seen.insert(key.join("\u{1F}")) {
                    duplicates += 1;
                }
            }
            duplicates as f64
        });

        let numeric = doc.columns_of_type(ColumnType::Numeric);
        let mut numeric_cells = 0usize;
        let mut outlier_cells = 0usize;
        let mut range_violations = 0usize;
        let mut drift_sum = 0.0;
        let mut drift_count = 0usize;
        for name in &numeric {
            let values = doc.numeric_values(name).unwrap_or_default();
            numeric_cells += values.len();
            if let Some((q1, q3)) = stats::quartiles(&values) {
                let iqr = q3 - q1;
                let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
                outlier_cells += values.iter().filter(|v| **v < lower || **v > upper).count();
            }
            if values.len() > 1 {
                if let (Some(mean), Some(std)) =
                    (stats::mean(&values), stats::std_dev(&values))
                {
                    if std > 0.0 {
                        let (lower, upper) = (mean - 3.0 * std, mean + 3.0 * std);
                        range_violations +=
                            values.iter().filter(|v| **v < lower || **v > upper).count();
                        if let Some(median) = stats::median(&values) {
                            drift_sum += (mean - median).abs() / std;
                            drift_count += 1;
                        }
                    }
                }
            }
        }
        let outlier_rate =
            (numeric_cells > 0).then(|| outlier_cells as f64 / numeric_cells as f64);
        let range_violation_rate =
            (numeric_cells > 0).then(|| range_violations as f64 / numeric_cells as f64);
        let mean_median_drift = (drift_count > 0).then(|| drift_sum / drift_count as f64);

        let feature_correlation_mean = if numeric.len() > 1 {
            let mut sum = 0.0;
            let mut count = 0usize;
            let by_row: Vec<Vec<Option<f64>>> = numeric
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
            for i in 0..numeric.len() {
                for j in (i + 1)..numeric.len() {
                    let (a, b): (Vec<f64>, Vec<f64>) = by_row[i]
                        .iter()
                        .zip(by_row[j].iter())
                        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                        .unzip();
                    if let Some(r) = stats::pearson(&a, &b) {
                        sum += r.abs();
                        count += 1;
                    }
                }
            }
            (count > 0).then(|| sum / count as f64)
        } else {
            None
        };

        // Per-cell coercion failures against the declared column type.
        let mut typed_cells = 0usize;
        let mut mismatched = 0usize;
        for column in doc.columns() {
            for row in doc.rows() {
                let Some(value) = row.get(&column.name) else {
                    continue;
                };
                if value.is_missing() {
                    continue;
                }
                typed_cells += 1;
                let ok = match column.ty {
                    ColumnType::Numeric => value.as_number().is_some(),
                    ColumnType::Date => {
                        crate::document::parse_date(&value.to_display()).is_some()
                    }
                    ColumnType::Text => true,
                };
                if !ok {
                    mismatched += 1;
                }
            }
        }
        let data_type_mismatch_rate =
            (typed_cells > 0).then(|| mismatched as f64 / typed_cells as f64);

        // A column is inconsistent when its non-missing values mix
        // numeric-parseable and unparseable content.
        let inconsistency_rate = (cols > 0).then(|| {
            let inconsistent = doc
                .columns()
                .iter()
                .filter(|column| {
                    let mut saw_numeric = false;
                    let mut saw_text = false;
                    for row in doc.rows() {
                        if let Some(value) = row.get(&column.name) {
                            if value.is_missing() {
                                continue;
                            }
                            if value.as_number().is_some() {
                                saw_numeric = true;
                            } else {
                                saw_text = true;
                            }
                        }
                    }
                    saw_numeric && saw_text
                })
                .count();
            inconsistent as f64 / cols as f64
        });

        let text = doc.columns_of_type(ColumnType::Text);
        let cardinality_categorical = if text.is_empty() {
            None
        } else {
            let total: usize = text
                .iter()
                .map(|name| {
                    doc.rows()
                        .iter()
                        .filter_map(|row| row.get(name.as_str()))
                        .filter(|v| !v.is_missing())
                        .map(CellValue::to_display)
                        .collect::<HashSet<_>>()
                        .len()
                })
                .sum();
            Some(total as f64 / text.len() as f64)
        };

        Self {
            missing_values_pct,
            duplicate_records_count,
            outlier_rate,
            inconsistency_rate,
            data_type_mismatch_rate,
            feature_correlation_mean,
            range_violation_rate,
            mean_median_drift,
            cardinality_categorical,
        }
    }
}
