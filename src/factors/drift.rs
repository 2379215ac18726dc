//! Mean-median drift factor: detect skewed numeric columns and apply a
//! variance-stabilizing monotonic transform.

use serde::Serialize;
use serde_json::json;

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    error::Result,
    issue::{Issue, IssueCategory, IssueSeverity},
    stats,
};

use super::{FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Settings for the drift factor.
#[derive(Debug, Clone)]
pub struct DriftConfig {
    /// Relative drift `|mean - median| / mean` above which a column is
    /// transformed.
    pub threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self { threshold: 0.2 }
    }
}

/// Monotonic transform applied to a drifted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftTransform {
    /// `ln(1 + x)` after shifting.
    Log,
    /// `sqrt(x)` after shifting.
    Sqrt,
    /// Box-Cox-like power 0.5: `2 * (sqrt(x) - 1)` after shifting.
    Power,
}

impl DriftTransform {
    /// Name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Sqrt => "sqrt",
            Self::Power => "power",
        }
    }

    /// Pick a transform from the column's skewness: heavier tails get
    /// stronger compression.
    fn for_skewness(skew: f64) -> Self {
        if skew.abs() > 1.0 {
            Self::Log
        } else if skew.abs() > 0.5 {
            Self::Sqrt
        } else {
            Self::Power
        }
    }

    /// Apply to one value, already domain-shifted.
    fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Log => value.ln_1p(),
            Self::Sqrt => value.sqrt(),
            Self::Power => 2.0 * (value.sqrt() - 1.0),
        }
    }
}

/// Distribution profile of one numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDriftProfile {
    /// Column name.
    pub column: String,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Relative drift `|mean - median| / mean`; `None` when the mean is
    /// zero.
    pub drift: Option<f64>,
    /// Third-moment skewness.
    pub skewness: f64,
    /// Transform selected when the drift exceeds the threshold.
    pub transform: Option<DriftTransform>,
}

/// Mean-median drift detector/fixer.
pub struct MeanMedianDrift;

impl MeanMedianDrift {
    /// Profile every numeric column against the drift threshold.
    pub fn drift_profile(
        doc: &TableDocument,
        threshold: f64,
    ) -> Result<Vec<ColumnDriftProfile>> {
        let mut profiles = Vec::new();
        for name in doc.columns_of_type(ColumnType::Numeric) {
            let values = doc.numeric_values(&name)?;
            let (Some(mean), Some(median), Some(skewness)) = (
                stats::mean(&values),
                stats::median(&values),
                stats::skewness(&values),
            ) else {
                continue;
            };
            let drift = stats::mean_median_drift(&values);
            let transform = match drift {
                Some(d) if d > threshold => Some(DriftTransform::for_skewness(skewness)),
                _ => None,
            };
            profiles.push(ColumnDriftProfile {
                column: name,
                mean,
                median,
                drift,
                skewness,
                transform,
            });
        }
        Ok(profiles)
    }
}

impl QualityFactor for MeanMedianDrift {
    fn id(&self) -> FactorId {
        FactorId::MeanMedianDrift
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let issues = Self::drift_profile(doc, config.drift.threshold)?
            .into_iter()
            .filter(|p| p.transform.is_some())
            .map(|p| {
                Issue::flag(
                    0,
                    &p.column,
                    CellValue::Null,
                    format!(
                        "'{}' is skewed: drift {:.1}%, skewness {:.2}",
                        p.column,
                        p.drift.unwrap_or(0.0) * 100.0,
                        p.skewness
                    ),
                    IssueCategory::LogicalError,
                    IssueSeverity::Info,
                )
            })
            .collect();
        Ok(issues)
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let profiles = Self::drift_profile(doc, config.drift.threshold)?;
        let mut fixed = doc.clone();
        let mut transformed: Vec<String> = Vec::new();
        let mut log = Vec::new();

        for profile in profiles {
            let Some(transform) = profile.transform else {
                continue;
            };
            let values = doc.numeric_values(&profile.column)?;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            // Shift the domain so the transform stays defined for
            // non-positive values.
            let shift = if min <= 0.0 { -min + 1.0 } else { 0.0 };

            for i in 0..fixed.num_rows() {
                if let Some(CellValue::Number(n)) = fixed.value(i, &profile.column) {
                    if n.is_finite() {
                        let new = transform.apply(n + shift);
                        fixed.set_value(i, &profile.column, CellValue::Number(new))?;
                    }
                }
            }
            log.push(format!(
                "Applied {} transformation to {} due to high mean-median drift ({:.2}%)",
                transform.name(),
                profile.column,
                profile.drift.unwrap_or(0.0) * 100.0
            ));
            transformed.push(profile.column);
        }

        let stats = json!({
            "columns_with_drift": transformed.len(),
            "transformed_columns": transformed,
        });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}
