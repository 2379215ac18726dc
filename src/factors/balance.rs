//! Class-imbalance factor: distribution analysis plus resampling by
//! replication.
//!
//! Both strategies are strictly label-preserving: undersampling keeps a
//! random subset of existing rows, oversampling duplicates existing
//! rows verbatim. Synthetic interpolation (SMOTE) is delegated to the
//! external compute service.

use std::collections::HashMap;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    document::TableDocument,
    error::{Error, Result},
    issue::{Issue, IssueCategory, IssueSeverity},
};

use super::{FactorId, FactorOutcome, PipelineConfig, QualityFactor};

/// Resampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceStrategy {
    /// Truncate every class to the minority class size.
    #[default]
    Undersample,
    /// Replicate minority rows up to the majority class size.
    Oversample,
}

impl BalanceStrategy {
    /// Name used in report stats.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undersample => "undersample",
            Self::Oversample => "oversample",
        }
    }
}

/// Settings for the class-imbalance factor.
#[derive(Debug, Clone, Default)]
pub struct BalanceConfig {
    /// Target column holding class labels. `None` disables the factor.
    pub target: Option<String>,
    /// Resampling strategy.
    pub strategy: BalanceStrategy,
    /// Seed for deterministic resampling.
    pub seed: Option<u64>,
}

/// Distribution of classes over a target column.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDistribution {
    /// Count per class label.
    pub counts: HashMap<String, usize>,
    /// Total labeled rows (missing targets excluded).
    pub total: usize,
    /// Number of distinct classes.
    pub num_classes: usize,
    /// Most frequent class.
    pub majority_class: Option<String>,
    /// Least frequent class.
    pub minority_class: Option<String>,
}

impl ClassDistribution {
    /// Build the distribution for a document's target column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist.
    pub fn from_document(doc: &TableDocument, target: &str) -> Result<Self> {
        if !doc.has_column(target) {
            return Err(Error::column_not_found(target));
        }
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in doc.rows() {
            let Some(value) = row.get(target) else {
                continue;
            };
            if value.is_missing() {
                continue;
            }
            *counts.entry(value.to_display()).or_insert(0) += 1;
        }
        Ok(Self::from_counts(counts))
    }

    /// Build a distribution from precomputed counts.
    pub fn from_counts(counts: HashMap<String, usize>) -> Self {
        let total = counts.values().sum();
        let num_classes = counts.len();
        let majority_class = counts
            .iter()
            .max_by_key(|(_, &v)| v)
            .map(|(k, _)| k.clone());
        let minority_class = counts
            .iter()
            .filter(|(_, &v)| v > 0)
            .min_by_key(|(_, &v)| v)
            .map(|(k, _)| k.clone());
        Self {
            counts,
            total,
            num_classes,
            majority_class,
            minority_class,
        }
    }

    /// Minority-to-majority ratio in (0, 1]; 1.0 when fewer than two
    /// classes exist.
    #[allow(clippy::cast_precision_loss)]
    pub fn imbalance_ratio(&self) -> f64 {
        let max = self.counts.values().copied().max().unwrap_or(0);
        let min = self.counts.values().copied().min().unwrap_or(0);
        if max == 0 || self.num_classes < 2 {
            return 1.0;
        }
        min as f64 / max as f64
    }

    /// True when the minority class is under half the majority size.
    pub fn is_imbalanced(&self) -> bool {
        self.imbalance_ratio() < 0.5
    }

    /// True when every class has the same count.
    pub fn is_uniform(&self) -> bool {
        let max = self.counts.values().copied().max().unwrap_or(0);
        let min = self.counts.values().copied().min().unwrap_or(0);
        max == min
    }
}

/// Class-imbalance detector/fixer.
pub struct ClassImbalance;

impl ClassImbalance {
    fn rng(config: &PipelineConfig) -> StdRng {
        match config.balance.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Row indices per class, in row order. Rows with a missing target
    /// belong to no class and are never resampled.
    fn class_members(doc: &TableDocument, target: &str) -> HashMap<String, Vec<usize>> {
        let mut members: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in doc.rows().iter().enumerate() {
            let Some(value) = row.get(target) else {
                continue;
            };
            if value.is_missing() {
                continue;
            }
            members.entry(value.to_display()).or_default().push(i);
        }
        members
    }

    fn undersample(
        doc: &TableDocument,
        target: &str,
        rng: &mut StdRng,
    ) -> TableDocument {
        let members = Self::class_members(doc, target);
        let Some(min_size) = members.values().map(Vec::len).min() else {
            return doc.clone();
        };

        let mut drop: Vec<bool> = vec![false; doc.num_rows()];
        // Deterministic class order so a seeded run is reproducible.
        let mut classes: Vec<&String> = members.keys().collect();
        classes.sort();
        for class in classes {
            let mut indices = members[class].clone();
            indices.shuffle(rng);
            for &i in indices.iter().skip(min_size) {
                drop[i] = true;
            }
        }

        let rows = doc
            .rows()
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop[*i])
            .map(|(_, row)| row.clone())
            .collect();
        doc.with_rows(rows)
    }

    fn oversample(doc: &TableDocument, target: &str, rng: &mut StdRng) -> TableDocument {
        let members = Self::class_members(doc, target);
        let Some(max_size) = members.values().map(Vec::len).max() else {
            return doc.clone();
        };

        let mut rows: Vec<_> = doc.rows().to_vec();
        let mut classes: Vec<&String> = members.keys().collect();
        classes.sort();
        for class in classes {
            let indices = &members[class];
            let mut count = indices.len();
            while count < max_size {
                let pick = indices[rng.gen_range(0..indices.len())];
                if let Some(row) = doc.row(pick) {
                    rows.push(row.clone());
                }
                count += 1;
            }
        }
        doc.with_rows(rows)
    }
}

impl QualityFactor for ClassImbalance {
    fn id(&self) -> FactorId {
        FactorId::ClassImbalance
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        let Some(target) = &config.balance.target else {
            return Ok(Vec::new());
        };
        let distribution = ClassDistribution::from_document(doc, target)?;
        if !distribution.is_imbalanced() {
            return Ok(Vec::new());
        }
        let value = doc.value(0, target).cloned().unwrap_or_default();
        Ok(vec![Issue::flag(
            0,
            target,
            value,
            format!(
                "class distribution is imbalanced (minority/majority ratio {:.3}, {} classes)",
                distribution.imbalance_ratio(),
                distribution.num_classes
            ),
            IssueCategory::LogicalError,
            IssueSeverity::Info,
        )])
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let Some(target) = &config.balance.target else {
            return Ok(FactorOutcome::unchanged(
                doc.clone(),
                json!({ "resampled": false, "reason": "no target column configured" }),
            ));
        };
        let distribution = ClassDistribution::from_document(doc, target)?;
        if distribution.num_classes < 2 || distribution.is_uniform() {
            return Ok(FactorOutcome::unchanged(
                doc.clone(),
                json!({
                    "resampled": false,
                    "original_ratio": distribution.imbalance_ratio(),
                    "method": config.balance.strategy.as_str(),
                }),
            ));
        }

        let before = doc.num_rows();
        let mut rng = Self::rng(config);
        let balanced = match config.balance.strategy {
            BalanceStrategy::Undersample => Self::undersample(doc, target, &mut rng),
            BalanceStrategy::Oversample => Self::oversample(doc, target, &mut rng),
        };
        let after = balanced.num_rows();

        let log = vec![format!(
            "Applied {} to balance '{}': {} -> {} rows",
            config.balance.strategy.as_str(),
            target,
            before,
            after
        )];
        let stats = json!({
            "resampled": true,
            "original_ratio": distribution.imbalance_ratio(),
            "method": config.balance.strategy.as_str(),
            "before_rows": before,
            "after_rows": after,
        });
        Ok(FactorOutcome {
            document: balanced,
            stats,
            log,
        })
    }
}
