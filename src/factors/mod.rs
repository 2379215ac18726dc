//! Quality factors: one detector/fixer pair per data-quality dimension.
//!
//! Factors are registered in a fixed declared order (the order of
//! [`FactorId::ALL`]) so downstream factors observe upstream effects
//! deterministically no matter how callers list them. Adding a factor
//! means implementing [`QualityFactor`] and registering it in
//! [`registry`], not editing a dispatch switch.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::TableDocument,
    error::{Error, Result},
    issue::Issue,
    rules::RuleSet,
};

mod balance;
mod cardinality;
mod correlation;
mod drift;
mod duplicates;
mod missing;
mod outliers;
mod range;
mod validity;
mod variance;

pub use balance::{BalanceConfig, BalanceStrategy, ClassDistribution, ClassImbalance};
pub use cardinality::{Cardinality, CardinalityConfig};
pub use correlation::{CorrelatedPair, CorrelationConfig, FeatureCorrelation};
pub use drift::{ColumnDriftProfile, DriftConfig, DriftTransform, MeanMedianDrift};
pub use duplicates::{DuplicateConfig, Duplicates, Keep};
pub use missing::{MissingConfig, MissingValues};
pub use outliers::{OutlierConfig, Outliers};
pub use range::{RangeAction, RangeConfig, RangeRule, RangeViolations};
pub use validity::{DataTypeMismatch, InconsistentFormats, InvalidData};
pub use variance::{LowVariance, VarianceConfig};

/// Identifier of a quality factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorId {
    /// Missing value detection and imputation.
    MissingValues,
    /// Duplicate record removal.
    Duplicates,
    /// Domain and logical rule violations.
    InvalidData,
    /// Values that do not coerce to the declared column type.
    DataTypeMismatch,
    /// Email/phone/URL format and plausibility violations.
    InconsistentFormats,
    /// Statistical outliers in numeric columns.
    Outliers,
    /// High-cardinality categorical columns.
    Cardinality,
    /// Near-constant columns.
    LowVariance,
    /// Highly correlated numeric column pairs.
    FeatureCorrelation,
    /// Skewed numeric distributions (mean-median drift).
    MeanMedianDrift,
    /// Values outside configured or derived ranges.
    RangeViolations,
    /// Class imbalance in a target column.
    ClassImbalance,
}

impl FactorId {
    /// All factors in declared pipeline execution order.
    pub const ALL: [FactorId; 12] = [
        Self::MissingValues,
        Self::Duplicates,
        Self::InvalidData,
        Self::DataTypeMismatch,
        Self::InconsistentFormats,
        Self::Outliers,
        Self::Cardinality,
        Self::LowVariance,
        Self::FeatureCorrelation,
        Self::MeanMedianDrift,
        Self::RangeViolations,
        Self::ClassImbalance,
    ];

    /// Snake-case id used in configs, reports, and the service wire
    /// format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingValues => "missing_values",
            Self::Duplicates => "duplicates",
            Self::InvalidData => "invalid_data",
            Self::DataTypeMismatch => "data_type_mismatch",
            Self::InconsistentFormats => "inconsistent_formats",
            Self::Outliers => "outliers",
            Self::Cardinality => "cardinality",
            Self::LowVariance => "low_variance",
            Self::FeatureCorrelation => "feature_correlation",
            Self::MeanMedianDrift => "mean_median_drift",
            Self::RangeViolations => "range_violations",
            Self::ClassImbalance => "class_imbalance",
        }
    }

    /// Short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingValues => "Handle missing data with type-aware defaults",
            Self::Duplicates => "Remove duplicate records by composite key",
            Self::InvalidData => "Fix domain and logical rule violations",
            Self::DataTypeMismatch => "Coerce values to declared column types",
            Self::InconsistentFormats => "Standardize email, phone, URL, and date formats",
            Self::Outliers => "Handle outliers via the IQR rule",
            Self::Cardinality => "Fold high-cardinality categories into 'Other'",
            Self::LowVariance => "Remove near-constant columns",
            Self::FeatureCorrelation => "Remove highly correlated features",
            Self::MeanMedianDrift => "Transform skewed numeric distributions",
            Self::RangeViolations => "Enforce per-column value ranges",
            Self::ClassImbalance => "Rebalance the target class distribution",
        }
    }
}

impl std::fmt::Display for FactorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactorId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::invalid_config(format!("unknown factor id '{s}'")))
    }
}

/// Configuration for the full pipeline, one section per factor plus the
/// shared cell rule set.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Name-substring cell validation rules.
    pub rules: RuleSet,
    /// Missing-value factor settings.
    pub missing: MissingConfig,
    /// Duplicate factor settings.
    pub duplicates: DuplicateConfig,
    /// Outlier factor settings.
    pub outliers: OutlierConfig,
    /// Cardinality factor settings.
    pub cardinality: CardinalityConfig,
    /// Low-variance factor settings.
    pub variance: VarianceConfig,
    /// Correlation factor settings.
    pub correlation: CorrelationConfig,
    /// Drift factor settings.
    pub drift: DriftConfig,
    /// Range-violation factor settings.
    pub range: RangeConfig,
    /// Class-imbalance factor settings.
    pub balance: BalanceConfig,
}

impl PipelineConfig {
    /// Set the target column for class balancing.
    #[must_use]
    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.balance.target = Some(column.into());
        self
    }

    /// Set the resampling seed for deterministic balancing.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.balance.seed = Some(seed);
        self
    }

    /// Override the cell rule set.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }
}

/// Result of applying one factor's fixer.
#[derive(Debug, Clone)]
pub struct FactorOutcome {
    /// The corrected document. Input documents are never mutated.
    pub document: TableDocument,
    /// Free-form per-factor statistics for the report.
    pub stats: Value,
    /// Human-readable log lines describing what changed.
    pub log: Vec<String>,
}

impl FactorOutcome {
    /// Outcome that leaves the document unchanged.
    pub fn unchanged(document: TableDocument, stats: Value) -> Self {
        Self {
            document,
            stats,
            log: Vec::new(),
        }
    }
}

/// A quality factor: a pure detector plus a copy-on-write fixer.
pub trait QualityFactor: Send + Sync {
    /// The factor's identifier.
    fn id(&self) -> FactorId;

    /// Detect issues without modifying the document.
    ///
    /// # Errors
    ///
    /// Returns an error if detection cannot run (for example a
    /// configured column is absent).
    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>>;

    /// Apply corrections, returning a new document plus stats and log
    /// lines. Never mutates the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the fix cannot be applied.
    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome>;
}

/// Build the factor registry in declared execution order.
pub fn registry() -> Vec<Box<dyn QualityFactor>> {
    vec![
        Box::new(MissingValues),
        Box::new(Duplicates),
        Box::new(InvalidData),
        Box::new(DataTypeMismatch),
        Box::new(InconsistentFormats),
        Box::new(Outliers),
        Box::new(Cardinality),
        Box::new(LowVariance),
        Box::new(FeatureCorrelation),
        Box::new(MeanMedianDrift),
        Box::new(RangeViolations),
        Box::new(ClassImbalance),
    ]
}

/// Apply every issue's suggested fix to a copy of the document.
///
/// Cells flagged without an explicit fix but categorized as missing or
/// type-mismatched fall back to the shared default generator, so every
/// flagged cell receives *some* value.
pub fn apply_issue_fixes(
    doc: &TableDocument,
    issues: &[Issue],
    rules: &RuleSet,
) -> Result<(TableDocument, usize)> {
    use crate::issue::IssueCategory;

    let mut fixed = doc.clone();
    let mut applied = 0usize;
    for issue in issues {
        let Some(column) = doc.column(&issue.column).cloned() else {
            continue;
        };
        let replacement = match &issue.suggested_fix {
            Some(fix) => Some(fix.clone()),
            None => match issue.category {
                IssueCategory::MissingValue | IssueCategory::TypeMismatch => {
                    Some(rules.default_fix(&column).0)
                }
                _ => None,
            },
        };
        if let Some(value) = replacement {
            fixed.set_value(issue.row_index, &issue.column, value)?;
            applied += 1;
        }
    }
    Ok((fixed, applied))
}
