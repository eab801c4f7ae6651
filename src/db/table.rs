//! Tabular query results
//!
//! A `Table` is the driver-independent shape of a query result: named columns
//! and rows of dynamically typed cells. Lookups only ever read the first row or
//! one whole column, by name.

use crate::error::AppError;
use serde::Deserialize;
use serde_json::{Number, Value};
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// SQL NULL
    Null,
    /// Integer column
    Int(i64),
    /// Floating point column
    Float(f64),
    /// Text column
    Text(String),
    /// Boolean column
    Bool(bool),
}

impl Cell {
    /// Read the cell as an integer identifier
    ///
    /// Floats with no fractional part and numeric text are accepted, since
    /// some stores hand back identifiers as `NUMERIC` or `VARCHAR`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                Some(*v as i64)
            }
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to a JSON value for the request payload
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Int(v) => Value::from(*v),
            Cell::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Bool(b) => Value::Bool(*b),
        }
    }

    /// Read the cell as an integer, naming `column` in the error
    pub fn expect_i64(&self, column: &'static str) -> Result<i64, AppError> {
        self.as_i64().ok_or_else(|| AppError::InvalidValue {
            column,
            value: self.to_string(),
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Limits applied when a table is rendered into the debug log
///
/// `None` (JSON `null`) or `0` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Rows shown before the middle is elided
    #[serde(rename = "pdmaxrows")]
    pub max_rows: Option<usize>,
    /// Columns shown before the middle is elided
    #[serde(rename = "pdmaxcolumns")]
    pub max_columns: Option<usize>,
    /// Maximum characters per rendered line
    #[serde(rename = "pdmaxwidth")]
    pub max_width: Option<usize>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            max_rows: Some(60),
            max_columns: Some(20),
            max_width: Some(80),
        }
    }
}

/// Rows × named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create a table; every row must have one cell per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// Column names in query order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the query returned no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name`, compared ASCII case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Value of `column` in the first row
    ///
    /// # Errors
    /// * `AppError::LookupEmpty` if there are no rows
    /// * `AppError::MissingColumn` if the column is absent
    pub fn first(&self, lookup: &'static str, column: &'static str) -> Result<&Cell, AppError> {
        let row = self
            .rows
            .first()
            .ok_or(AppError::LookupEmpty { lookup, column })?;
        let idx = self
            .column_index(column)
            .ok_or(AppError::MissingColumn { lookup, column })?;
        Ok(&row[idx])
    }

    /// Every value of `column`, in row order
    ///
    /// An empty table yields an empty list whatever the column name, since a
    /// result with no rows carries no column metadata.
    pub fn column(&self, lookup: &'static str, column: &'static str) -> Result<Vec<&Cell>, AppError> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }
        let idx = self
            .column_index(column)
            .ok_or(AppError::MissingColumn { lookup, column })?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Render as an aligned text grid, eliding the middle of long tables
    pub fn render(&self, opts: &DisplayOptions) -> String {
        if self.rows.is_empty() {
            return format!("Empty table\nColumns: [{}]", self.columns.join(", "));
        }

        let col_idx = elide(self.columns.len(), opts.max_columns);
        let row_idx = elide(self.rows.len(), opts.max_rows);
        let truncated = col_idx.contains(&None) || row_idx.contains(&None);

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(row_idx.len() + 1);
        let mut header = vec![String::new()];
        header.extend(col_idx.iter().map(|c| match c {
            Some(c) => self.columns[*c].clone(),
            None => "...".to_string(),
        }));
        grid.push(header);

        for r in &row_idx {
            let mut line = Vec::with_capacity(col_idx.len() + 1);
            match r {
                Some(r) => {
                    line.push(r.to_string());
                    line.extend(col_idx.iter().map(|c| match c {
                        Some(c) => self.rows[*r][*c].to_string(),
                        None => "...".to_string(),
                    }));
                }
                None => line.extend(std::iter::repeat("...".to_string()).take(col_idx.len() + 1)),
            }
            grid.push(line);
        }

        let mut widths = vec![0usize; col_idx.len() + 1];
        for line in &grid {
            for (i, s) in line.iter().enumerate() {
                widths[i] = widths[i].max(s.chars().count());
            }
        }

        let mut out: Vec<String> = grid
            .iter()
            .map(|line| {
                let joined = line
                    .iter()
                    .zip(&widths)
                    .map(|(s, w)| format!("{:>width$}", s, width = *w))
                    .collect::<Vec<_>>()
                    .join("  ");
                clip(joined, opts.max_width)
            })
            .collect();

        if truncated {
            out.push(String::new());
            out.push(format!(
                "[{} rows x {} columns]",
                self.rows.len(),
                self.columns.len()
            ));
        }
        out.join("\n")
    }
}

/// Indices to show; `None` marks the elided middle
fn elide(len: usize, max: Option<usize>) -> Vec<Option<usize>> {
    match max {
        Some(max) if max > 0 && len > max => {
            let head = max.div_ceil(2);
            let tail = max / 2;
            (0..head)
                .map(Some)
                .chain(std::iter::once(None))
                .chain((len - tail..len).map(Some))
                .collect()
        }
        _ => (0..len).map(Some).collect(),
    }
}

fn clip(line: String, max_width: Option<usize>) -> String {
    match max_width {
        Some(w) if w > 0 && line.chars().count() > w => {
            let mut clipped: String = line.chars().take(w.saturating_sub(3)).collect();
            clipped.push_str("...");
            clipped
        }
        _ => line,
    }
}
