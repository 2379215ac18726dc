//! Tabular document model for limpiar.
//!
//! A [`TableDocument`] is an ordered set of typed columns plus rows keyed
//! by column name. Construction validates that every row carries exactly
//! the declared column set, so schema drift is rejected at the door
//! rather than tolerated downstream. Pipeline transforms never mutate a
//! document in place; the mutating methods exist for the editor session,
//! which owns its document exclusively.

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Date formats accepted when parsing and type-sniffing date columns.
///
/// The list is ordered; the first matching format wins.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Fraction of non-missing values that must parse as a type for CSV
/// inference to pick it.
const INFER_THRESHOLD: f64 = 0.8;

/// Parse a date string against the pinned format list.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Floating-point numbers.
    Numeric,
    /// Free-form text, including categorical values.
    Text,
    /// Calendar dates, stored as text and validated against
    /// [`DATE_FORMATS`].
    Date,
}

impl ColumnType {
    /// Lowercase name used in reports and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Date => "date",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within a document.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    /// Create a new column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A single cell value.
///
/// Serialized untagged so report and wire JSON carry plain scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Absent value.
    #[default]
    Null,
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
}

impl CellValue {
    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True when the value counts as missing: `Null`, empty/whitespace
    /// text, or the literal strings "null"/"undefined"
    /// (case-insensitive).
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(_) => false,
            Self::Text(s) => {
                let t = s.trim();
                t.is_empty() || t.eq_ignore_ascii_case("null") || t.eq_ignore_ascii_case("undefined")
            }
        }
    }

    /// Numeric view: `Number` directly, or text that parses fully as a
    /// number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Null => None,
        }
    }

    /// Text view of a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Display form used at the CSV boundary. `Null` renders empty;
    /// whole numbers render without a trailing `.0` so round-trips are
    /// stable.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Text(s) => s.clone(),
        }
    }

    /// Build a typed cell from a raw CSV field. Empty fields become
    /// `Null`; numeric columns keep unparseable text verbatim so the
    /// type-mismatch detector sees the original value.
    pub fn from_field(field: &str, ty: ColumnType) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match ty {
            ColumnType::Numeric => match trimmed.parse::<f64>() {
                Ok(n) => Self::Number(n),
                Err(_) => Self::Text(trimmed.to_string()),
            },
            ColumnType::Text | ColumnType::Date => Self::Text(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_display())
    }
}

/// A row: mapping from column name to cell value.
pub type Row = std::collections::HashMap<String, CellValue>;

/// Options for CSV parsing.
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Field delimiter; `None` means comma.
    pub delimiter: Option<u8>,
    /// Declared column types, bypassing inference. Must match the header
    /// count when provided.
    pub types: Option<Vec<ColumnType>>,
}

/// An in-memory tabular document: ordered typed columns plus rows.
///
/// # Example
///
/// ```
/// use limpiar::{CellValue, TableDocument};
///
/// let doc = TableDocument::from_csv_str("name,age\nana,34\nbo,29\n").unwrap();
/// assert_eq!(doc.shape(), (2, 2));
/// assert_eq!(doc.value(0, "age"), Some(&CellValue::Number(34.0)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableDocument {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TableDocument {
    /// Create a document, validating the schema invariants: column names
    /// are unique and every row's key set equals the column name set.
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::schema_mismatch(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            Self::validate_row(&columns, row, i)?;
        }
        Ok(Self { columns, rows })
    }

    /// Create an empty document with the given columns.
    pub fn empty(columns: Vec<Column>) -> Result<Self> {
        Self::new(columns, Vec::new())
    }

    fn validate_row(columns: &[Column], row: &Row, index: usize) -> Result<()> {
        if row.len() != columns.len() {
            return Err(Error::schema_mismatch(format!(
                "row {} has {} values, expected {}",
                index,
                row.len(),
                columns.len()
            )));
        }
        for column in columns {
            if !row.contains_key(&column.name) {
                return Err(Error::schema_mismatch(format!(
                    "row {} is missing column '{}'",
                    index, column.name
                )));
            }
        }
        Ok(())
    }

    /// Replace the row set, keeping the schema. Internal to pipeline
    /// transforms, which build rows from existing validated rows.
    pub(crate) fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Return a copy without the named columns (schema and row keys).
    pub(crate) fn without_columns(&self, names: &HashSet<String>) -> Self {
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name))
            .cloned()
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|(k, _)| !names.contains(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Declared columns, in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// True if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column names, in display order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of columns with the given declared type, in display order.
    pub fn columns_of_type(&self, ty: ColumnType) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.ty == ty)
            .map(|c| c.name.clone())
            .collect()
    }

    /// All rows, in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// A single row by index.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns) pair.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// True when the document has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value at (row, column).
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Overwrite a cell value.
    pub fn set_value(&mut self, row: usize, column: &str, value: CellValue) -> Result<()> {
        if !self.has_column(column) {
            return Err(Error::column_not_found(column));
        }
        let len = self.rows.len();
        let slot = self
            .rows
            .get_mut(row)
            .ok_or(Error::RowIndexOutOfBounds { index: row, len })?;
        slot.insert(column.to_string(), value);
        Ok(())
    }

    /// Append a row after validating it against the schema.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        Self::validate_row(&self.columns, &row, self.rows.len())?;
        self.rows.push(row);
        Ok(())
    }

    /// Remove a row by index.
    pub fn remove_row(&mut self, index: usize) -> Result<Row> {
        if index >= self.rows.len() {
            return Err(Error::RowIndexOutOfBounds {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Append a column, filling every existing row with `default`.
    pub fn add_column(&mut self, column: Column, default: CellValue) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(Error::schema_mismatch(format!(
                "duplicate column name '{}'",
                column.name
            )));
        }
        for row in &mut self.rows {
            row.insert(column.name.clone(), default.clone());
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column from the schema and every row.
    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        let pos = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::column_not_found(name))?;
        let column = self.columns.remove(pos);
        for row in &mut self.rows {
            row.remove(name);
        }
        Ok(column)
    }

    /// Merge two columns into one text column placed at the left
    /// column's position. Values are joined with `separator`; missing
    /// sides are skipped so a single present value survives unchanged.
    pub fn merge_columns(
        &mut self,
        left: &str,
        right: &str,
        new_name: &str,
        separator: &str,
    ) -> Result<()> {
        let left_pos = self
            .columns
            .iter()
            .position(|c| c.name == left)
            .ok_or_else(|| Error::column_not_found(left))?;
        if !self.has_column(right) {
            return Err(Error::column_not_found(right));
        }
        if new_name != left && new_name != right && self.has_column(new_name) {
            return Err(Error::schema_mismatch(format!(
                "duplicate column name '{new_name}'"
            )));
        }

        for row in &mut self.rows {
            let lhs = row.remove(left).unwrap_or_default();
            let rhs = row.remove(right).unwrap_or_default();
            let mut parts = Vec::new();
            if !lhs.is_missing() {
                parts.push(lhs.to_display());
            }
            if !rhs.is_missing() {
                parts.push(rhs.to_display());
            }
            let merged = if parts.is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(parts.join(separator))
            };
            row.insert(new_name.to_string(), merged);
        }

        self.columns.retain(|c| c.name != left && c.name != right);
        self.columns
            .insert(left_pos, Column::new(new_name, ColumnType::Text));
        Ok(())
    }

    /// Non-missing numeric values of a column, in row order. Text that
    /// does not parse as a number is skipped.
    pub fn numeric_values(&self, column: &str) -> Result<Vec<f64>> {
        if !self.has_column(column) {
            return Err(Error::column_not_found(column));
        }
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|v| !v.is_missing())
            .filter_map(CellValue::as_number)
            .filter(|v| v.is_finite())
            .collect())
    }

    /// Count of missing cells across the whole document.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.values())
            .filter(|v| v.is_missing())
            .count()
    }

    /// Declared type per column name, in a stable (sorted) map for
    /// report output.
    pub fn data_types(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.ty.as_str().to_string()))
            .collect()
    }

    // ─── CSV boundary ────────────────────────────────────────────────

    /// Parse a document from CSV text, inferring column types.
    ///
    /// The first line is the header; empty lines are discarded, so the
    /// reported row count equals line count minus one header.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed CSV, duplicate headers, or a
    /// declared-type count that does not match the header.
    pub fn from_csv_str(data: &str) -> Result<Self> {
        Self::from_csv_str_with_options(data, CsvOptions::default())
    }

    /// Parse a document from CSV text with explicit options.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TableDocument::from_csv_str`].
    pub fn from_csv_str_with_options(data: &str, options: CsvOptions) -> Result<Self> {
        let mut builder = csv::ReaderBuilder::new();
        builder.has_headers(true).flexible(false);
        if let Some(delim) = options.delimiter {
            builder.delimiter(delim);
        }
        let mut reader = builder.from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(Error::EmptyDocument);
        }

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            raw_rows.push(record.iter().map(ToString::to_string).collect());
        }

        let types = match options.types {
            Some(types) => {
                if types.len() != headers.len() {
                    return Err(Error::invalid_config(format!(
                        "{} column types declared for {} headers",
                        types.len(),
                        headers.len()
                    )));
                }
                types
            }
            None => (0..headers.len())
                .map(|j| infer_column_type(raw_rows.iter().map(|r| r[j].as_str())))
                .collect(),
        };

        let columns: Vec<Column> = headers
            .iter()
            .zip(types.iter())
            .map(|(name, ty)| Column::new(name, *ty))
            .collect();

        let rows: Vec<Row> = raw_rows
            .iter()
            .map(|raw| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(j, col)| (col.name.clone(), CellValue::from_field(&raw[j], col.ty)))
                    .collect()
            })
            .collect();

        Self::new(columns, rows)
    }

    /// Load a document from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        Self::from_csv_str(&data)
    }

    /// Serialize to CSV text: header row, then one line per row, fields
    /// quoted as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if CSV writing fails.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in &self.rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|c| row.get(&c.name).map(CellValue::to_display).unwrap_or_default())
                .collect();
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::parse(format!("CSV writer flush failed: {e}")))?;
        String::from_utf8(bytes).map_err(|e| Error::parse(format!("CSV output not UTF-8: {e}")))
    }

    /// Write the document to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_csv_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = self.to_csv_string()?;
        std::fs::write(path, data).map_err(|e| Error::io(e, path))
    }
}

/// Infer a column type from raw string fields using the 80% rule:
/// mostly-numeric wins, then mostly-date, else text.
fn infer_column_type<'a>(fields: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut total = 0usize;
    let mut numeric = 0usize;
    let mut dates = 0usize;
    for field in fields {
        let value = CellValue::Text(field.to_string());
        if value.is_missing() {
            continue;
        }
        total += 1;
        if field.trim().parse::<f64>().is_ok() {
            numeric += 1;
        } else if parse_date(field).is_some() {
            dates += 1;
        }
    }
    if total == 0 {
        return ColumnType::Text;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = |count: usize| count as f64 / total as f64;
    if ratio(numeric) > INFER_THRESHOLD {
        ColumnType::Numeric
    } else if ratio(dates) > INFER_THRESHOLD {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> TableDocument {
        TableDocument::from_csv_str(
            "name,age,joined\nana,34,2020-01-15\nbo,29,2021-06-01\ncy,41,2019-11-20\n",
        )
        .unwrap()
    }

    #[test]
    fn test_csv_type_inference() {
        let doc = sample_doc();
        assert_eq!(doc.column("name").unwrap().ty, ColumnType::Text);
        assert_eq!(doc.column("age").unwrap().ty, ColumnType::Numeric);
        assert_eq!(doc.column("joined").unwrap().ty, ColumnType::Date);
    }

    #[test]
    fn test_empty_lines_discarded() {
        let doc = TableDocument::from_csv_str("a,b\n1,2\n\n,\n3,4\n").unwrap();
        assert_eq!(doc.num_rows(), 2);
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = TableDocument::from_csv_str("a,a\n1,2\n").unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_row_key_set_validated() {
        let columns = vec![
            Column::new("a", ColumnType::Numeric),
            Column::new("b", ColumnType::Text),
        ];
        let mut row = Row::new();
        row.insert("a".to_string(), CellValue::Number(1.0));
        row.insert("c".to_string(), CellValue::Text("x".to_string()));
        let err = TableDocument::new(columns, vec![row]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_csv_round_trip() {
        let doc = sample_doc();
        let csv = doc.to_csv_string().unwrap();
        let reparsed = TableDocument::from_csv_str(&csv).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_csv_quoting_round_trip() {
        let doc = TableDocument::from_csv_str(
            "note,score\n\"hello, world\",1\n\"say \"\"hi\"\"\",2\nplain,3\n",
        )
        .unwrap();
        assert_eq!(
            doc.value(0, "note"),
            Some(&CellValue::Text("hello, world".to_string()))
        );
        let reparsed = TableDocument::from_csv_str(&doc.to_csv_string().unwrap()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_missing_value_forms() {
        assert!(CellValue::Null.is_missing());
        assert!(CellValue::Text(String::new()).is_missing());
        assert!(CellValue::Text("  ".to_string()).is_missing());
        assert!(CellValue::Text("null".to_string()).is_missing());
        assert!(CellValue::Text("NULL".to_string()).is_missing());
        assert!(CellValue::Text("undefined".to_string()).is_missing());
        assert!(!CellValue::Text("0".to_string()).is_missing());
        assert!(!CellValue::Number(0.0).is_missing());
    }

    #[test]
    fn test_number_display_round_trip() {
        assert_eq!(CellValue::Number(34.0).to_display(), "34");
        assert_eq!(CellValue::Number(2.5).to_display(), "2.5");
        assert_eq!(CellValue::Number(-7.0).to_display(), "-7");
    }

    #[test]
    fn test_unparseable_numeric_kept_verbatim() {
        let doc = TableDocument::from_csv_str_with_options(
            "age\nthirty\n",
            CsvOptions {
                delimiter: None,
                types: Some(vec![ColumnType::Numeric]),
            },
        )
        .unwrap();
        assert_eq!(
            doc.value(0, "age"),
            Some(&CellValue::Text("thirty".to_string()))
        );
    }

    #[test]
    fn test_add_remove_column() {
        let mut doc = sample_doc();
        doc.add_column(Column::new("team", ColumnType::Text), CellValue::Null)
            .unwrap();
        assert_eq!(doc.num_columns(), 4);
        assert_eq!(doc.value(0, "team"), Some(&CellValue::Null));

        let removed = doc.remove_column("team").unwrap();
        assert_eq!(removed.name, "team");
        assert_eq!(doc.num_columns(), 3);
        assert!(doc.row(0).unwrap().get("team").is_none());
    }

    #[test]
    fn test_merge_columns() {
        let mut doc =
            TableDocument::from_csv_str("first,last,age\nana,diaz,34\nbo,,29\n").unwrap();
        doc.merge_columns("first", "last", "full_name", " ").unwrap();
        assert_eq!(doc.column_names(), vec!["full_name", "age"]);
        assert_eq!(
            doc.value(0, "full_name"),
            Some(&CellValue::Text("ana diaz".to_string()))
        );
        // missing right side leaves the left value alone
        assert_eq!(
            doc.value(1, "full_name"),
            Some(&CellValue::Text("bo".to_string()))
        );
    }

    #[test]
    fn test_push_row_validates_schema() {
        let mut doc = sample_doc();
        let mut bad = Row::new();
        bad.insert("name".to_string(), CellValue::Text("zed".to_string()));
        assert!(doc.push_row(bad).is_err());
    }

    #[test]
    fn test_numeric_values_skips_unparseable() {
        let doc = TableDocument::from_csv_str_with_options(
            "v\n1\nbad\n3\n\n",
            CsvOptions {
                delimiter: None,
                types: Some(vec![ColumnType::Numeric]),
            },
        )
        .unwrap();
        assert_eq!(doc.numeric_values("v").unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_date_parse_formats() {
        assert!(parse_date("2024-03-01").is_some());
        assert!(parse_date("01/03/2024").is_some());
        assert!(parse_date("Mar 1, 2024").is_some());
        assert!(parse_date("not a date").is_none());
    }
}
