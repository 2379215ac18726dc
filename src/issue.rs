//! Detected data-quality issues.
//!
//! An [`Issue`] is a descriptive fact about one cell (or row), never a
//! mutation: applying the suggested fix is a separate step owned by the
//! factor fixers. Field names serialize to the wire form consumers
//! expect (`rowIndex`, `suggestedFix`, ...).

use serde::{Deserialize, Serialize};

use crate::document::CellValue;

/// Category of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Value cannot be coerced to the column's declared type.
    TypeMismatch,
    /// Value is outside the column's recognized value set.
    DomainError,
    /// Value is outside a plausible or configured range.
    RangeError,
    /// Value fails a format validator (email, phone, URL).
    FormatError,
    /// Value is absent.
    MissingValue,
    /// Value contradicts a logical rule (negative age, boolean token in
    /// a numeric column, duplicate row).
    LogicalError,
}

impl IssueCategory {
    /// Snake-case name used in report output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeMismatch => "type_mismatch",
            Self::DomainError => "domain_error",
            Self::RangeError => "range_error",
            Self::FormatError => "format_error",
            Self::MissingValue => "missing_value",
            Self::LogicalError => "logical_error",
        }
    }
}

/// Severity of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Informational; the value is usable as-is.
    Info,
    /// Should be fixed before analysis.
    Warning,
    /// Blocks downstream processing of the cell.
    Critical,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A single detected problem at a specific row/column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Zero-based row index the issue was found at.
    pub row_index: usize,
    /// Column name.
    pub column: String,
    /// The value as seen by the detector.
    pub value: CellValue,
    /// The value before any earlier fix in the same pass.
    pub original_value: CellValue,
    /// Human-readable description of the problem.
    #[serde(rename = "issue")]
    pub message: String,
    /// Issue category.
    pub category: IssueCategory,
    /// Issue severity.
    pub severity: IssueSeverity,
    /// Replacement value, when one could be derived. `None` means
    /// flag-only.
    pub suggested_fix: Option<CellValue>,
    /// Why the suggested fix was chosen.
    pub fix_reason: Option<String>,
}

impl Issue {
    /// Create an issue with no suggested fix.
    pub fn flag(
        row_index: usize,
        column: impl Into<String>,
        value: CellValue,
        message: impl Into<String>,
        category: IssueCategory,
        severity: IssueSeverity,
    ) -> Self {
        Self {
            row_index,
            column: column.into(),
            original_value: value.clone(),
            value,
            message: message.into(),
            category,
            severity,
            suggested_fix: None,
            fix_reason: None,
        }
    }

    /// Attach a suggested fix and its rationale.
    #[must_use]
    pub fn with_fix(mut self, fix: CellValue, reason: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix);
        self.fix_reason = Some(reason.into());
        self
    }

    /// True when a replacement value is available.
    pub fn has_fix(&self) -> bool {
        self.suggested_fix.is_some()
    }
}
