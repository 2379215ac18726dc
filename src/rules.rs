//! Per-cell validation rules.
//!
//! The name-substring heuristics here ("age", "percent", "gender", ...)
//! are deliberate source behavior and are pinned by tests. They live in
//! a [`RuleSet`] value rather than hard-coded matches so callers can
//! override the substrings without forking the validators.
//!
//! Missing cells short-circuit: every check other than
//! [`RuleSet::check_missing`] skips a missing value, so a missing cell
//! yields exactly one issue.

use std::sync::LazyLock;

use chrono::{Datelike, Months, NaiveDate, Utc};
use regex::Regex;

use crate::{
    document::{parse_date, CellValue, Column, ColumnType},
    issue::{Issue, IssueCategory, IssueSeverity},
};

/// First signed integer or decimal in a string, used for numeric
/// coercion of mistyped cells.
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:\.\d+)?").unwrap_or_else(|e| panic!("invalid number regex: {e}"))
});

/// Email format validator.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("invalid email regex: {e}"))
});

/// Phone format validator: optional leading `+`, then at least ten
/// digits/spaces/dashes/parentheses.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[\d\s\-()]{10,}$").unwrap_or_else(|e| panic!("invalid phone regex: {e}"))
});

/// Fallback date when a cell has no recoverable date content.
pub const DEFAULT_DATE: &str = "2000-01-01";
/// Fallback email placeholder.
pub const EMAIL_PLACEHOLDER: &str = "user@example.com";
/// Fallback phone placeholder.
pub const PHONE_PLACEHOLDER: &str = "+1-000-000-0000";
/// Fallback URL placeholder.
pub const URL_PLACEHOLDER: &str = "https://example.com";
/// Fallback for missing text cells.
pub const TEXT_DEFAULT: &str = "Unknown";
/// Earliest plausible year for date cells.
pub const MIN_DATE_YEAR: i32 = 1900;
/// Dates further ahead than this many years are flagged.
pub const MAX_FUTURE_YEARS: u32 = 10;

/// Name-substring rule set driving domain, format, and default-fix
/// behavior.
///
/// All matches are case-insensitive substring tests against the column
/// name.
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// Columns whose values must not be negative.
    pub non_negative: Vec<String>,
    /// Columns bounded to the [0, 100] interval.
    pub percent_like: Vec<String>,
    /// Columns validated against `gender_values`.
    pub gender_like: Vec<String>,
    /// Columns validated as email addresses.
    pub email_like: Vec<String>,
    /// Columns validated as phone numbers.
    pub phone_like: Vec<String>,
    /// Columns validated as URLs.
    pub url_like: Vec<String>,
    /// Columns defaulting to 0 when missing.
    pub age_like: Vec<String>,
    /// Recognized gender values (lowercase).
    pub gender_values: Vec<String>,
    /// Minimum plausible digit count for a numeric phone column.
    pub min_phone_digits: usize,
    /// Maximum plausible digit count for a numeric phone column.
    pub max_phone_digits: usize,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            non_negative: vec!["age".into(), "price".into(), "amount".into()],
            percent_like: vec!["percent".into(), "rate".into()],
            gender_like: vec!["gender".into()],
            email_like: vec!["email".into()],
            phone_like: vec!["phone".into()],
            url_like: vec!["url".into(), "website".into()],
            age_like: vec!["age".into()],
            gender_values: vec![
                "male".into(),
                "female".into(),
                "m".into(),
                "f".into(),
                "other".into(),
                "non-binary".into(),
                "nonbinary".into(),
                "prefer not to say".into(),
            ],
            min_phone_digits: 7,
            max_phone_digits: 15,
        }
    }
}

fn name_matches(name: &str, patterns: &[String]) -> bool {
    let lower = name.to_lowercase();
    patterns.iter().any(|p| lower.contains(p.as_str()))
}

/// Upper bound for plausible dates: today plus [`MAX_FUTURE_YEARS`].
fn max_plausible_date() -> NaiveDate {
    let today = Utc::now().date_naive();
    today
        .checked_add_months(Months::new(MAX_FUTURE_YEARS * 12))
        .unwrap_or(today)
}

impl RuleSet {
    /// Type- and name-aware default value for a column, with the reason
    /// it was chosen. Shared by the missing-value detector and every
    /// fixer fallback so flagged cells always receive *some* value.
    pub fn default_fix(&self, column: &Column) -> (CellValue, String) {
        if name_matches(&column.name, &self.age_like) {
            return (
                CellValue::Number(0.0),
                format!("default 0 for '{}' column", column.name),
            );
        }
        if name_matches(&column.name, &self.email_like) {
            return (
                CellValue::Text(EMAIL_PLACEHOLDER.to_string()),
                "placeholder email address".to_string(),
            );
        }
        match column.ty {
            ColumnType::Numeric => (
                CellValue::Number(0.0),
                "default 0 for numeric column".to_string(),
            ),
            ColumnType::Date => (
                CellValue::Text(DEFAULT_DATE.to_string()),
                format!("default date {DEFAULT_DATE}"),
            ),
            ColumnType::Text => (
                CellValue::Text(TEXT_DEFAULT.to_string()),
                format!("default '{TEXT_DEFAULT}' for text column"),
            ),
        }
    }

    /// Flag a missing cell (null, empty, or literal "null"/"undefined")
    /// with a default-value fix.
    pub fn check_missing(&self, row: usize, column: &Column, value: &CellValue) -> Option<Issue> {
        if !value.is_missing() {
            return None;
        }
        let (fix, reason) = self.default_fix(column);
        Some(
            Issue::flag(
                row,
                &column.name,
                value.clone(),
                format!("missing value in '{}'", column.name),
                IssueCategory::MissingValue,
                IssueSeverity::Warning,
            )
            .with_fix(fix, reason),
        )
    }

    /// Attempt coercion to the declared column type; failure yields a
    /// critical type-mismatch issue with an extracted or default fix.
    pub fn check_type(&self, row: usize, column: &Column, value: &CellValue) -> Option<Issue> {
        if value.is_missing() {
            return None;
        }
        match column.ty {
            ColumnType::Numeric => {
                if value.as_number().is_some() {
                    return None;
                }
                let raw = value.to_display();
                let issue = Issue::flag(
                    row,
                    &column.name,
                    value.clone(),
                    format!("'{}' is not numeric", raw),
                    IssueCategory::TypeMismatch,
                    IssueSeverity::Critical,
                );
                match NUMBER_RE.find(&raw).and_then(|m| m.as_str().parse::<f64>().ok()) {
                    Some(extracted) => Some(issue.with_fix(
                        CellValue::Number(extracted),
                        format!("extracted numeric value {extracted} from '{raw}'"),
                    )),
                    None => {
                        let (fix, reason) = self.default_fix(column);
                        Some(issue.with_fix(fix, format!("no numeric content; {reason}")))
                    }
                }
            }
            ColumnType::Date => {
                let raw = value.to_display();
                if parse_date(&raw).is_some() {
                    return None;
                }
                let issue = Issue::flag(
                    row,
                    &column.name,
                    value.clone(),
                    format!("'{}' is not a recognizable date", raw),
                    IssueCategory::TypeMismatch,
                    IssueSeverity::Critical,
                );
                let (fix, reason) = self.default_fix(column);
                Some(issue.with_fix(fix, format!("unparseable date; {reason}")))
            }
            ColumnType::Text => None,
        }
    }

    /// Name-pattern domain and logical rules: negative quantities,
    /// out-of-range percentages, unrecognized gender values, and boolean
    /// tokens in non-text columns.
    pub fn check_domain(&self, row: usize, column: &Column, value: &CellValue) -> Option<Issue> {
        if value.is_missing() {
            return None;
        }

        if name_matches(&column.name, &self.non_negative) {
            if let Some(n) = value.as_number() {
                if n < 0.0 {
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!("'{}' cannot be negative (got {})", column.name, n),
                            IssueCategory::LogicalError,
                            IssueSeverity::Warning,
                        )
                        .with_fix(CellValue::Number(n.abs()), "absolute value applied"),
                    );
                }
            }
        }

        if name_matches(&column.name, &self.percent_like) {
            if let Some(n) = value.as_number() {
                if !(0.0..=100.0).contains(&n) {
                    let clamped = n.clamp(0.0, 100.0);
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!("'{}' must be within 0-100 (got {})", column.name, n),
                            IssueCategory::RangeError,
                            IssueSeverity::Warning,
                        )
                        .with_fix(
                            CellValue::Number(clamped),
                            format!("clamped to {clamped}"),
                        ),
                    );
                }
            }
        }

        if name_matches(&column.name, &self.gender_like) {
            if let Some(text) = value.as_text() {
                let lower = text.trim().to_lowercase();
                if !self.gender_values.iter().any(|g| g == &lower) {
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!("unrecognized gender value '{text}'"),
                            IssueCategory::DomainError,
                            IssueSeverity::Warning,
                        )
                        .with_fix(
                            CellValue::Text("Other".to_string()),
                            "defaulted to 'Other'",
                        ),
                    );
                }
            }
        }

        if column.ty != ColumnType::Text {
            if let Some(text) = value.as_text() {
                if let Some(numeric) = boolean_token(text) {
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!("boolean token '{text}' in {} column", column.ty),
                            IssueCategory::LogicalError,
                            IssueSeverity::Info,
                        )
                        .with_fix(
                            CellValue::Number(numeric),
                            format!("coerced '{text}' to {numeric}"),
                        ),
                    );
                }
            }
        }

        None
    }

    /// Format validators (email, phone, URL) plus plausibility ranges
    /// for dates and numeric phone columns.
    pub fn check_format(&self, row: usize, column: &Column, value: &CellValue) -> Option<Issue> {
        if value.is_missing() {
            return None;
        }

        if name_matches(&column.name, &self.email_like) {
            if let Some(text) = value.as_text() {
                if !EMAIL_RE.is_match(text.trim()) {
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!("'{text}' is not a valid email address"),
                            IssueCategory::FormatError,
                            IssueSeverity::Warning,
                        )
                        .with_fix(
                            CellValue::Text(EMAIL_PLACEHOLDER.to_string()),
                            "placeholder email address",
                        ),
                    );
                }
            }
        }

        if name_matches(&column.name, &self.phone_like) {
            match (column.ty, value) {
                // Text phone columns get the format regex.
                (ColumnType::Text, CellValue::Text(text)) => {
                    if !PHONE_RE.is_match(text.trim()) {
                        return Some(
                            Issue::flag(
                                row,
                                &column.name,
                                value.clone(),
                                format!("'{text}' is not a valid phone number"),
                                IssueCategory::FormatError,
                                IssueSeverity::Warning,
                            )
                            .with_fix(
                                CellValue::Text(PHONE_PLACEHOLDER.to_string()),
                                "placeholder phone number",
                            ),
                        );
                    }
                }
                // Numeric phone columns get a digit-count plausibility
                // check with no auto-fix.
                (ColumnType::Numeric, _) => {
                    if let Some(n) = value.as_number() {
                        let digits = count_digits(n);
                        if digits < self.min_phone_digits || digits > self.max_phone_digits {
                            return Some(Issue::flag(
                                row,
                                &column.name,
                                value.clone(),
                                format!(
                                    "phone number has {} digits, expected {}-{}",
                                    digits, self.min_phone_digits, self.max_phone_digits
                                ),
                                IssueCategory::RangeError,
                                IssueSeverity::Warning,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        if name_matches(&column.name, &self.url_like) {
            if let Some(text) = value.as_text() {
                if url::Url::parse(text.trim()).is_err() {
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!("'{text}' is not a valid URL"),
                            IssueCategory::FormatError,
                            IssueSeverity::Warning,
                        )
                        .with_fix(
                            CellValue::Text(URL_PLACEHOLDER.to_string()),
                            "placeholder URL",
                        ),
                    );
                }
            }
        }

        if column.ty == ColumnType::Date {
            if let Some(date) = parse_date(&value.to_display()) {
                if date.year() < MIN_DATE_YEAR {
                    let floor = format!("{MIN_DATE_YEAR}-01-01");
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!("date {date} predates year {MIN_DATE_YEAR}"),
                            IssueCategory::RangeError,
                            IssueSeverity::Warning,
                        )
                        .with_fix(
                            CellValue::Text(floor.clone()),
                            format!("clamped to {floor}"),
                        ),
                    );
                }
                let ceiling = max_plausible_date();
                if date > ceiling {
                    let clamp = ceiling.format("%Y-%m-%d").to_string();
                    return Some(
                        Issue::flag(
                            row,
                            &column.name,
                            value.clone(),
                            format!(
                                "date {date} is more than {MAX_FUTURE_YEARS} years in the future"
                            ),
                            IssueCategory::RangeError,
                            IssueSeverity::Warning,
                        )
                        .with_fix(
                            CellValue::Text(clamp.clone()),
                            format!("clamped to {clamp}"),
                        ),
                    );
                }
            }
        }

        None
    }
}

/// Map a boolean-looking token to its numeric value.
fn boolean_token(text: &str) -> Option<f64> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(1.0),
        "no" | "n" | "false" | "0" => Some(0.0),
        _ => None,
    }
}

/// Count decimal digits in the integer part of a number.
fn count_digits(n: f64) -> usize {
    let mut int = n.abs().trunc();
    if int < 1.0 {
        return 1;
    }
    let mut digits = 0;
    while int >= 1.0 {
        int /= 10.0;
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(name: &str) -> Column {
        Column::new(name, ColumnType::Numeric)
    }

    fn text(name: &str) -> Column {
        Column::new(name, ColumnType::Text)
    }

    #[test]
    fn test_missing_short_circuits_other_checks() {
        let rules = RuleSet::default();
        let column = numeric("age");
        let value = CellValue::Null;
        assert!(rules.check_missing(0, &column, &value).is_some());
        assert!(rules.check_type(0, &column, &value).is_none());
        assert!(rules.check_domain(0, &column, &value).is_none());
        assert!(rules.check_format(0, &column, &value).is_none());
    }

    #[test]
    fn test_missing_default_is_name_aware() {
        let rules = RuleSet::default();
        let issue = rules
            .check_missing(0, &text("age_group"), &CellValue::Null)
            .unwrap();
        assert_eq!(issue.suggested_fix, Some(CellValue::Number(0.0)));

        let issue = rules
            .check_missing(0, &text("work_email"), &CellValue::Null)
            .unwrap();
        assert_eq!(
            issue.suggested_fix,
            Some(CellValue::Text(EMAIL_PLACEHOLDER.to_string()))
        );

        let issue = rules
            .check_missing(0, &text("city"), &CellValue::Null)
            .unwrap();
        assert_eq!(
            issue.suggested_fix,
            Some(CellValue::Text(TEXT_DEFAULT.to_string()))
        );
    }

    #[test]
    fn test_numeric_coercion_extracts_first_number() {
        let rules = RuleSet::default();
        let issue = rules
            .check_type(2, &numeric("price"), &CellValue::Text("$19.99 USD".to_string()))
            .unwrap();
        assert_eq!(issue.category, IssueCategory::TypeMismatch);
        assert_eq!(issue.severity, IssueSeverity::Critical);
        assert_eq!(issue.suggested_fix, Some(CellValue::Number(19.99)));
    }

    #[test]
    fn test_numeric_coercion_falls_back_to_default() {
        let rules = RuleSet::default();
        let issue = rules
            .check_type(0, &numeric("score"), &CellValue::Text("n/a".to_string()))
            .unwrap();
        assert_eq!(issue.suggested_fix, Some(CellValue::Number(0.0)));
        assert!(issue.fix_reason.unwrap().contains("no numeric content"));
    }

    #[test]
    fn test_date_coercion_default() {
        let rules = RuleSet::default();
        let column = Column::new("joined", ColumnType::Date);
        let issue = rules
            .check_type(0, &column, &CellValue::Text("sometime".to_string()))
            .unwrap();
        assert_eq!(
            issue.suggested_fix,
            Some(CellValue::Text(DEFAULT_DATE.to_string()))
        );
        assert!(rules
            .check_type(0, &column, &CellValue::Text("2020-05-05".to_string()))
            .is_none());
    }

    #[test]
    fn test_negative_age_flagged() {
        let rules = RuleSet::default();
        let issue = rules
            .check_domain(1, &numeric("age"), &CellValue::Number(-34.0))
            .unwrap();
        assert_eq!(issue.category, IssueCategory::LogicalError);
        assert_eq!(issue.suggested_fix, Some(CellValue::Number(34.0)));
        assert!(rules
            .check_domain(1, &numeric("age"), &CellValue::Number(34.0))
            .is_none());
    }

    #[test]
    fn test_negative_price_and_amount_flagged() {
        let rules = RuleSet::default();
        assert!(rules
            .check_domain(0, &numeric("unit_price"), &CellValue::Number(-1.0))
            .is_some());
        assert!(rules
            .check_domain(0, &numeric("total_amount"), &CellValue::Number(-1.0))
            .is_some());
    }

    #[test]
    fn test_percent_clamped() {
        let rules = RuleSet::default();
        let issue = rules
            .check_domain(0, &numeric("success_rate"), &CellValue::Number(140.0))
            .unwrap();
        assert_eq!(issue.category, IssueCategory::RangeError);
        assert_eq!(issue.suggested_fix, Some(CellValue::Number(100.0)));

        let issue = rules
            .check_domain(0, &numeric("percent_done"), &CellValue::Number(-5.0))
            .unwrap();
        assert_eq!(issue.suggested_fix, Some(CellValue::Number(0.0)));
    }

    #[test]
    fn test_gender_defaults_to_other() {
        let rules = RuleSet::default();
        let column = text("gender");
        let issue = rules
            .check_domain(0, &column, &CellValue::Text("xyz".to_string()))
            .unwrap();
        assert_eq!(issue.category, IssueCategory::DomainError);
        assert_eq!(issue.suggested_fix, Some(CellValue::Text("Other".to_string())));

        assert!(rules
            .check_domain(0, &column, &CellValue::Text("Female".to_string()))
            .is_none());
        // the fix itself is recognized, so re-detection is clean
        assert!(rules
            .check_domain(0, &column, &CellValue::Text("Other".to_string()))
            .is_none());
    }

    #[test]
    fn test_boolean_token_in_numeric_column() {
        let rules = RuleSet::default();
        let issue = rules
            .check_domain(0, &numeric("active"), &CellValue::Text("yes".to_string()))
            .unwrap();
        assert_eq!(issue.severity, IssueSeverity::Info);
        assert_eq!(issue.suggested_fix, Some(CellValue::Number(1.0)));

        // text columns may hold boolean words freely
        assert!(rules
            .check_domain(0, &text("notes"), &CellValue::Text("yes".to_string()))
            .is_none());
    }

    #[test]
    fn test_email_format() {
        let rules = RuleSet::default();
        let column = text("email");
        let issue = rules
            .check_format(0, &column, &CellValue::Text("not-an-email".to_string()))
            .unwrap();
        assert_eq!(issue.category, IssueCategory::FormatError);
        assert_eq!(
            issue.suggested_fix,
            Some(CellValue::Text(EMAIL_PLACEHOLDER.to_string()))
        );
        assert!(rules
            .check_format(0, &column, &CellValue::Text("ana@example.com".to_string()))
            .is_none());
        // the placeholder passes its own validator
        assert!(rules
            .check_format(0, &column, &CellValue::Text(EMAIL_PLACEHOLDER.to_string()))
            .is_none());
    }

    #[test]
    fn test_phone_format_and_placeholder() {
        let rules = RuleSet::default();
        let column = text("phone");
        assert!(rules
            .check_format(0, &column, &CellValue::Text("12345".to_string()))
            .is_some());
        assert!(rules
            .check_format(0, &column, &CellValue::Text("+1 (555) 010-2030".to_string()))
            .is_none());
        assert!(rules
            .check_format(0, &column, &CellValue::Text(PHONE_PLACEHOLDER.to_string()))
            .is_none());
    }

    #[test]
    fn test_numeric_phone_digit_range_flag_only() {
        let rules = RuleSet::default();
        let column = numeric("phone_number");
        let issue = rules
            .check_format(0, &column, &CellValue::Number(12345.0))
            .unwrap();
        assert_eq!(issue.category, IssueCategory::RangeError);
        assert!(issue.suggested_fix.is_none());

        assert!(rules
            .check_format(0, &column, &CellValue::Number(5550102030.0))
            .is_none());
    }

    #[test]
    fn test_url_format() {
        let rules = RuleSet::default();
        let column = text("website_url");
        let issue = rules
            .check_format(0, &column, &CellValue::Text("not a url".to_string()))
            .unwrap();
        assert_eq!(
            issue.suggested_fix,
            Some(CellValue::Text(URL_PLACEHOLDER.to_string()))
        );
        assert!(rules
            .check_format(0, &column, &CellValue::Text("https://example.com/x".to_string()))
            .is_none());
    }

    #[test]
    fn test_date_range_clamps() {
        let rules = RuleSet::default();
        let column = Column::new("born", ColumnType::Date);
        let issue = rules
            .check_format(0, &column, &CellValue::Text("1850-06-01".to_string()))
            .unwrap();
        assert_eq!(issue.category, IssueCategory::RangeError);
        assert_eq!(
            issue.suggested_fix,
            Some(CellValue::Text("1900-01-01".to_string()))
        );

        let issue = rules
            .check_format(0, &column, &CellValue::Text("2990-01-01".to_string()))
            .unwrap();
        assert!(issue.message.contains("in the future"));
        assert!(issue.suggested_fix.is_some());

        assert!(rules
            .check_format(0, &column, &CellValue::Text("2020-05-05".to_string()))
            .is_none());
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(count_digits(0.0), 1);
        assert_eq!(count_digits(9.0), 1);
        assert_eq!(count_digits(1234567.0), 7);
        assert_eq!(count_digits(-5550102030.0), 10);
    }
}
