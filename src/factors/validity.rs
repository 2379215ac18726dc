//! Cell-validity factors: domain rules, type coercion, and format
//! standardization. All three share the pluggable [`crate::RuleSet`].

use serde_json::json;

use crate::{
    document::{CellValue, ColumnType, TableDocument},
    error::Result,
    issue::Issue,
};

use super::{apply_issue_fixes, FactorId, FactorOutcome, PipelineConfig, QualityFactor};

fn scan_cells<F>(doc: &TableDocument, mut check: F) -> Vec<Issue>
where
    F: FnMut(usize, &crate::document::Column, &CellValue) -> Option<Issue>,
{
    let mut issues = Vec::new();
    for (i, row) in doc.rows().iter().enumerate() {
        for column in doc.columns() {
            if let Some(value) = row.get(&column.name) {
                if let Some(issue) = check(i, column, value) {
                    issues.push(issue);
                }
            }
        }
    }
    issues
}

/// Domain and logical rule factor: negative quantities, out-of-range
/// percentages, unrecognized gender values, boolean tokens in numeric
/// columns, and non-finite numbers.
pub struct InvalidData;

impl QualityFactor for InvalidData {
    fn id(&self) -> FactorId {
        FactorId::InvalidData
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        Ok(scan_cells(doc, |i, column, value| {
            config.rules.check_domain(i, column, value)
        }))
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let issues = self.detect(doc, config)?;
        let (mut fixed, applied) = apply_issue_fixes(doc, &issues, &config.rules)?;

        // Non-finite numerics are unusable downstream; null them so the
        // missing-value defaults can take over on a later pass.
        let mut nulled = 0usize;
        for name in fixed.columns_of_type(ColumnType::Numeric) {
            for i in 0..fixed.num_rows() {
                if let Some(CellValue::Number(n)) = fixed.value(i, &name) {
                    if !n.is_finite() {
                        fixed.set_value(i, &name, CellValue::Null)?;
                        nulled += 1;
                    }
                }
            }
        }

        let mut log = Vec::new();
        if applied > 0 {
            log.push(format!("Fixed {applied} domain rule violations"));
        }
        if nulled > 0 {
            log.push(format!("Replaced {nulled} non-finite values with null"));
        }
        let stats = json!({ "invalid_values_fixed": applied + nulled });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}

/// Type-mismatch factor: coerce every cell to its declared column type,
/// extracting numeric content or defaulting where coercion fails.
pub struct DataTypeMismatch;

impl QualityFactor for DataTypeMismatch {
    fn id(&self) -> FactorId {
        FactorId::DataTypeMismatch
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        Ok(scan_cells(doc, |i, column, value| {
            config.rules.check_type(i, column, value)
        }))
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let issues = self.detect(doc, config)?;
        let (fixed, applied) = apply_issue_fixes(doc, &issues, &config.rules)?;
        let mut log = Vec::new();
        if applied > 0 {
            log.push(format!(
                "Coerced {applied} values to their declared column types"
            ));
        }
        let stats = json!({ "values_fixed": applied });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}

/// Format factor: email/phone/URL validators plus date and phone
/// plausibility ranges. Flag-only findings (numeric phone length) are
/// counted but never modified.
pub struct InconsistentFormats;

impl QualityFactor for InconsistentFormats {
    fn id(&self) -> FactorId {
        FactorId::InconsistentFormats
    }

    fn detect(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<Vec<Issue>> {
        Ok(scan_cells(doc, |i, column, value| {
            config.rules.check_format(i, column, value)
        }))
    }

    fn fix(&self, doc: &TableDocument, config: &PipelineConfig) -> Result<FactorOutcome> {
        let issues = self.detect(doc, config)?;
        let flagged_only = issues.iter().filter(|i| !i.has_fix()).count();
        let (fixed, applied) = apply_issue_fixes(doc, &issues, &config.rules)?;
        let mut log = Vec::new();
        if applied > 0 {
            log.push(format!("Standardized {applied} inconsistent formats"));
        }
        if flagged_only > 0 {
            log.push(format!(
                "Flagged {flagged_only} implausible values without an automatic fix"
            ));
        }
        let stats = json!({
            "values_fixed": applied,
            "flagged": flagged_only,
        });
        Ok(FactorOutcome {
            document: fixed,
            stats,
            log,
        })
    }
}
