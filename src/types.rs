use crate::error::{EtlError, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

/// A single catalog cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders any non-null cell as text, the way a string cast would.
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Value::Null, Value::Int)
    }
}

/// Records from one source, sharing a fixed column set.
///
/// Every row is exactly as wide as `columns`; constructors pad short rows with
/// nulls and truncate long ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Batch {
    /// Zero records, no columns. What a failed read yields.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Builds a batch from column names and positional rows.
    pub fn from_records(columns: &[&str], records: Vec<Vec<Value>>) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect(), records)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.width())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::MissingColumn(name.to_string()))
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replaces every cell of `name` with `f(cell)`.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(Value) -> Value,
    {
        let idx = self.require(name)?;
        for row in &mut self.rows {
            let cell = std::mem::take(&mut row[idx]);
            row[idx] = f(cell);
        }
        Ok(())
    }

    /// Appends a column, or overwrites it if one with that name exists.
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(EtlError::Schema(format!(
                "column {} has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self.require(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(())
    }

    pub fn rename_columns<F>(&mut self, f: F)
    where
        F: Fn(&str) -> String,
    {
        for column in &mut self.columns {
            *column = f(column);
        }
    }

    /// One JSON object per record, keyed by column name.
    pub fn to_json_records(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| {
                        (
                            column.clone(),
                            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect()
    }
}
