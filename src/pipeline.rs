//! Pipeline orchestrator: run enabled factors in declared order,
//! aggregate per-factor stats and log lines, and summarize the result.

use std::collections::BTreeMap;

use crate::{
    document::TableDocument,
    error::Result,
    factors::{registry, FactorId, PipelineConfig, QualityFactor},
    report::{FinalDatasetInfo, PreprocessingReport},
};

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The cleaned document.
    pub document: TableDocument,
    /// Structured report of what every factor did.
    pub report: PreprocessingReport,
}

/// Top-level pipeline over the factor registry.
///
/// Factors always execute in the fixed declared order of
/// [`FactorId::ALL`], regardless of the order callers list them in, so
/// downstream factors observe upstream effects deterministically. A
/// factor that fails is logged and skipped; the rest of the pipeline
/// proceeds.
///
/// # Example
///
/// ```
/// use limpiar::{FactorId, Pipeline, TableDocument};
///
/// let doc = TableDocument::from_csv_str("age,city\n34,lima\n,lima\n34,lima\n").unwrap();
/// let outcome = Pipeline::with_defaults()
///     .run(&doc, &[FactorId::MissingValues, FactorId::Duplicates])
///     .unwrap();
/// assert_eq!(outcome.document.missing_count(), 0);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    factors: Vec<Box<dyn QualityFactor>>,
}

impl Pipeline {
    /// Build a pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            factors: registry(),
        }
    }

    /// Build a pipeline with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default())
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the enabled factors and return the cleaned document plus the
    /// report. The input document is never mutated.
    ///
    /// # Errors
    ///
    /// Individual factor failures are absorbed into the report; only
    /// report assembly itself can fail.
    pub fn run(&self, doc: &TableDocument, enabled: &[FactorId]) -> Result<PipelineOutcome> {
        let mut current = doc.clone();
        let mut stats = BTreeMap::new();
        let mut log = Vec::new();

        for factor in &self.factors {
            let id = factor.id();
            if !enabled.contains(&id) {
                continue;
            }
            match factor.fix(&current, &self.config) {
                Ok(outcome) => {
                    stats.insert(id.as_str().to_string(), outcome.stats);
                    log.extend(outcome.log);
                    current = outcome.document;
                }
                Err(err) => {
                    tracing::warn!(factor = id.as_str(), error = %err, "factor skipped");
                    log.push(format!("Factor {id} skipped: {err}"));
                }
            }
        }

        let report = PreprocessingReport {
            preprocessing_stats: stats,
            preprocessing_log: log,
            final_dataset_info: FinalDatasetInfo::from_document(&current),
        };
        Ok(PipelineOutcome {
            document: current,
            report,
        })
    }

    /// Run every registered factor.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Pipeline::run`].
    pub fn run_all(&self, doc: &TableDocument) -> Result<PipelineOutcome> {
        self.run(doc, &FactorId::ALL)
    }

    /// Preview mode: produce the report only, leaving no mutated
    /// document in the caller's hands.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Pipeline::run`].
    pub fn dry_run(
        &self,
        doc: &TableDocument,
        enabled: &[FactorId],
    ) -> Result<PreprocessingReport> {
        Ok(self.run(doc, enabled)?.report)
    }
}
