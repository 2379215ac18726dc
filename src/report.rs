//! Preprocessing report types.
//!
//! The JSON shape here is a wire contract: consumers depend on the key
//! names `preprocessing_stats`, `preprocessing_log`, and
//! `final_dataset_info` exactly as serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    document::{ColumnType, TableDocument},
    error::Result,
};

/// Free-form per-factor statistics, keyed by factor id.
pub type FactorStats = serde_json::Value;

/// Shape and typing summary of the final document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalDatasetInfo {
    /// `[rows, columns]`.
    pub shape: [usize; 2],
    /// Numeric column names, in display order.
    pub numeric_columns: Vec<String>,
    /// Text (categorical) column names, in display order.
    pub categorical_columns: Vec<String>,
    /// Date column names, in display order.
    pub datetime_columns: Vec<String>,
    /// Residual missing-cell count.
    pub missing_values: usize,
    /// Declared type per column.
    pub data_types: BTreeMap<String, String>,
}

impl FinalDatasetInfo {
    /// Summarize a document.
    pub fn from_document(doc: &TableDocument) -> Self {
        let (rows, cols) = doc.shape();
        Self {
            shape: [rows, cols],
            numeric_columns: doc.columns_of_type(ColumnType::Numeric),
            categorical_columns: doc.columns_of_type(ColumnType::Text),
            datetime_columns: doc.columns_of_type(ColumnType::Date),
            missing_values: doc.missing_count(),
            data_types: doc.data_types(),
        }
    }
}

/// Structured result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingReport {
    /// Per-factor statistics, keyed by factor id. Every enabled factor
    /// contributes an entry, even when it found nothing to fix.
    pub preprocessing_stats: BTreeMap<String, FactorStats>,
    /// Ordered human-readable log of what each factor changed.
    pub preprocessing_log: Vec<String>,
    /// Summary of the resulting document.
    pub final_dataset_info: FinalDatasetInfo,
}

impl PreprocessingReport {
    /// Pretty-printed JSON, the downloadable report format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Statistics for a single factor, if it ran.
    pub fn factor_stats(&self, factor: &str) -> Option<&FactorStats> {
        self.preprocessing_stats.get(factor)
    }
}
