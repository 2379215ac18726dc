//! limpiar - Data Quality Pipeline and Versioned Tabular Editing
//!
//! Load a tabular dataset, run a pipeline of per-factor quality
//! detectors and fixers, and get back a cleaned dataset, a structured
//! preprocessing report, and an aggregate 0-100 quality score. The same
//! document model backs a spreadsheet-style editing session with
//! multi-step undo/redo and exact-state restoration.
//!
//! # Design Principles
//!
//! 1. **Copy-on-write pipeline** - detectors and fixers never mutate
//!    their input; every transform returns a new document
//! 2. **Registry, not dispatch switch** - factors register once and run
//!    in a fixed declared order
//! 3. **Descriptive issues** - detection produces facts with suggested
//!    fixes; applying them is a separate, idempotent step
//! 4. **Local core, remote heft** - statistical rules run in-process;
//!    MICE/SMOTE-class algorithms stay behind a request/response client
//!
//! # Quick Start
//!
//! ```
//! use limpiar::{FactorId, Pipeline, TableDocument};
//!
//! let doc = TableDocument::from_csv_str("age,city\n34,lima\n,quito\n34,lima\n").unwrap();
//!
//! let outcome = Pipeline::with_defaults().run_all(&doc).unwrap();
//! assert_eq!(outcome.document.missing_count(), 0);
//! println!("{}", outcome.report.to_json_pretty().unwrap());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::too_many_lines,
        clippy::field_reassign_with_default
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::map_unwrap_or)]

/// CLI module for command-line interface
#[cfg(feature = "cli")]
pub mod cli;
pub mod document;
pub mod editor;
pub mod error;
pub mod factors;
pub mod issue;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod score;
pub mod service;
pub mod stats;

// Re-exports for convenience
pub use document::{
    parse_date, CellValue, Column, ColumnType, CsvOptions, Row, TableDocument, DATE_FORMATS,
};
pub use editor::EditorSession;
pub use error::{Error, Result};
pub use factors::{
    registry, BalanceConfig, BalanceStrategy, Cardinality, CardinalityConfig, ClassDistribution,
    ClassImbalance, CorrelatedPair, CorrelationConfig, DataTypeMismatch, DriftConfig,
    DriftTransform, DuplicateConfig, Duplicates, FactorId, FactorOutcome, FeatureCorrelation,
    InconsistentFormats, InvalidData, Keep, LowVariance, MeanMedianDrift, MissingConfig,
    MissingValues, Outliers, OutlierConfig, PipelineConfig, QualityFactor, RangeAction,
    RangeConfig, RangeRule, RangeViolations, VarianceConfig,
};
pub use issue::{Issue, IssueCategory, IssueSeverity};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use report::{FactorStats, FinalDatasetInfo, PreprocessingReport};
pub use rules::RuleSet;
pub use score::{QualityMetrics, FALLBACK_SCORE};
pub use service::{ComputeClient, PreprocessRequest, PreprocessResponse};
