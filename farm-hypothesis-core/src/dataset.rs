//! Tabular dataset built from JSON records.
//!
//! A [`Dataset`] is an immutable table: rows are records, columns are the
//! record keys in order of first appearance. Cells are numeric, text or
//! missing.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};
use thiserror::Error;

/// Errors that can occur while building a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The input is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is valid but cannot be read as a table.
    #[error("JSON is not tabular: {0}")]
    NotTabular(String),

    /// A column-oriented object whose arrays differ in length.
    #[error("Column '{column}' has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        found: usize,
        expected: usize,
    },
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    fn from_json(value: &Json) -> Self {
        match value {
            Json::Null => Value::Missing,
            Json::Number(n) => match n.as_f64() {
                Some(x) if x.is_finite() => Value::Number(x),
                _ => Value::Text(n.to_string()),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Bool(b) => Value::Text(b.to_string()),
            other => Value::Text(other.to_string()),
        }
    }

    /// The numeric value, if this cell holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Label used when this cell is a grouping key.
    ///
    /// Integral numbers render without a fractional part so that `1` and
    /// `1.0` fall into the same group.
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => {
                Some(format!("{}", *x as i64))
            }
            Value::Number(x) => Some(x.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }
}

/// Non-missing values of one measurement that share a grouping label.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: String,
    pub values: Vec<f64>,
}

impl Group {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// An immutable table of records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Parse a JSON document into a dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or the JSON is not tabular.
    pub fn from_json_str(text: &str) -> Result<Self, DatasetError> {
        let value: Json = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Build a dataset from parsed JSON.
    ///
    /// Accepts an array of objects (one row per object) or an object of
    /// equal-length arrays (one column per key).
    pub fn from_json(value: &Json) -> Result<Self, DatasetError> {
        match value {
            Json::Array(records) => Self::from_records(records),
            Json::Object(columns) => Self::from_columns(columns),
            other => Err(DatasetError::NotTabular(format!(
                "expected an array of records or an object of columns, found {}",
                json_kind(other)
            ))),
        }
    }

    fn from_records(records: &[Json]) -> Result<Self, DatasetError> {
        let mut columns: Vec<String> = Vec::new();
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut objects = Vec::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            let Json::Object(object) = record else {
                return Err(DatasetError::NotTabular(format!(
                    "record {} is {}, expected an object",
                    position,
                    json_kind(record)
                )));
            };
            for key in object.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
            objects.push(object);
        }

        let rows = objects
            .into_iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|name| object.get(name).map_or(Value::Missing, Value::from_json))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    fn from_columns(object: &Map<String, Json>) -> Result<Self, DatasetError> {
        let mut columns = Vec::with_capacity(object.len());
        let mut cells: Vec<&Vec<Json>> = Vec::with_capacity(object.len());
        let mut height: Option<usize> = None;

        for (name, values) in object {
            let Json::Array(values) = values else {
                return Err(DatasetError::NotTabular(format!(
                    "column '{}' is {}, expected an array",
                    name,
                    json_kind(values)
                )));
            };
            match height {
                Some(expected) if expected != values.len() => {
                    return Err(DatasetError::RaggedColumn {
                        column: name.clone(),
                        found: values.len(),
                        expected,
                    });
                }
                _ => height = Some(values.len()),
            }
            columns.push(name.clone());
            cells.push(values);
        }

        let rows = (0..height.unwrap_or(0))
            .map(|row| {
                cells
                    .iter()
                    .map(|col| Value::from_json(&col[row]))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Column names in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of a column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Whether every cell of the column is a number or missing, with at
    /// least one number present.
    pub fn is_numeric(&self, name: &str) -> bool {
        let Some(cells) = self.column(name) else {
            return false;
        };
        let mut any_number = false;
        for cell in cells {
            match cell {
                Value::Number(_) => any_number = true,
                Value::Missing => {}
                Value::Text(_) => return false,
            }
        }
        any_number
    }

    /// Numeric columns in table order, leaving out `exclude`.
    pub fn numeric_columns(&self, exclude: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|name| !exclude.contains(name))
            .filter(|name| self.is_numeric(name))
            .cloned()
            .collect()
    }

    /// Non-missing numeric values of a column, in row order.
    pub fn non_missing(&self, name: &str) -> Vec<f64> {
        self.column(name)
            .map(|cells| cells.into_iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default()
    }

    /// Fraction of rows where the column has no numeric value.
    ///
    /// An empty dataset has a ratio of zero.
    pub fn missing_ratio(&self, name: &str) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let present = self.non_missing(name).len();
        (self.rows.len() - present) as f64 / self.rows.len() as f64
    }

    /// Values of `column` partitioned by the label of `group_by`.
    ///
    /// Rows where either field is missing are dropped. Groups are ordered by
    /// label, numerically when every label is a number; a missing column
    /// yields no groups.
    pub fn groups(&self, column: &str, group_by: &str) -> Vec<Group> {
        let (Some(value_index), Some(group_index)) =
            (self.column_index(column), self.column_index(group_by))
        else {
            return Vec::new();
        };

        let mut partition: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut numeric_keys: BTreeMap<String, f64> = BTreeMap::new();
        let mut all_numeric = true;
        for row in &self.rows {
            let (Some(value), Some(label)) = (row[value_index].as_f64(), row[group_index].label())
            else {
                continue;
            };
            match row[group_index].as_f64() {
                Some(key) => {
                    numeric_keys.insert(label.clone(), key);
                }
                None => all_numeric = false,
            }
            partition.entry(label).or_default().push(value);
        }

        let mut groups: Vec<Group> = partition
            .into_iter()
            .map(|(label, values)| Group::new(label, values))
            .collect();
        if all_numeric {
            let key = |group: &Group| numeric_keys.get(&group.label).copied().unwrap_or(f64::NAN);
            groups.sort_by(|a, b| key(a).total_cmp(&key(b)));
        }
        groups
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FARMS: &str = r#"[
        {"Farm ID": 1, "Kind of farm": "Organic", "Yield": 10.5, "Soil type": "clay"},
        {"Farm ID": 2, "Kind of farm": "Conventional", "Yield": null, "pH": 6.1},
        {"Farm ID": 3, "Kind of farm": "Organic", "Yield": 12, "pH": 6.4}
    ]"#;

    #[test]
    fn test_records_become_rows() {
        let dataset = Dataset::from_json_str(FARMS).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(
            dataset.columns(),
            &["Farm ID", "Kind of farm", "Yield", "Soil type", "pH"]
        );
        let soil = dataset.column("Soil type").unwrap();
        assert_eq!(soil[0], &Value::Text("clay".to_string()));
        assert!(soil[1].is_missing());
    }

    #[test]
    fn test_column_oriented_object() {
        let dataset =
            Dataset::from_json_str(r#"{"Kind of farm": ["A", "B"], "Yield": [1, 2]}"#).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.non_missing("Yield"), vec![1.0, 2.0]);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = Dataset::from_json_str(r#"{"a": [1, 2], "b": [1]}"#);
        assert!(matches!(
            result,
            Err(DatasetError::RaggedColumn { found: 1, expected: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_json() {
        let result = Dataset::from_json_str("{not json");
        assert!(matches!(result, Err(DatasetError::Json(_))));
    }

    #[test]
    fn test_scalar_is_not_tabular() {
        assert!(matches!(
            Dataset::from_json_str("42"),
            Err(DatasetError::NotTabular(_))
        ));
        assert!(matches!(
            Dataset::from_json_str(r#"[{"a": 1}, 3]"#),
            Err(DatasetError::NotTabular(_))
        ));
    }

    #[test]
    fn test_numeric_columns_skip_text_and_excluded() {
        let dataset = Dataset::from_json_str(FARMS).unwrap();
        let exclude = vec!["Farm ID".to_string()];

        assert_eq!(dataset.numeric_columns(&exclude), vec!["Yield", "pH"]);
    }

    #[test]
    fn test_all_missing_column_is_not_numeric() {
        let dataset = Dataset::from_json_str(r#"[{"x": null}, {"x": null}]"#).unwrap();
        assert!(!dataset.is_numeric("x"));
        assert!(!dataset.is_numeric("absent"));
    }

    #[test]
    fn test_booleans_are_not_numeric() {
        let dataset = Dataset::from_json_str(r#"[{"x": true}, {"x": 1}]"#).unwrap();
        assert!(!dataset.is_numeric("x"));
    }

    #[test]
    fn test_missing_ratio() {
        let dataset = Dataset::from_json_str(FARMS).unwrap();

        assert!((dataset.missing_ratio("Yield") - 1.0 / 3.0).abs() < 1e-12);
        assert!((dataset.missing_ratio("pH") - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(Dataset::default().missing_ratio("Yield"), 0.0);
    }

    #[test]
    fn test_groups_drop_incomplete_rows_and_sort_labels() {
        let dataset = Dataset::from_json_str(
            r#"[
                {"g": "b", "y": 1}, {"g": "a", "y": 2}, {"g": null, "y": 3},
                {"g": "b", "y": null}, {"g": "b", "y": 4}
            ]"#,
        )
        .unwrap();

        let groups = dataset.groups("y", "g");
        assert_eq!(
            groups,
            vec![Group::new("a", vec![2.0]), Group::new("b", vec![1.0, 4.0])]
        );
    }

    #[test]
    fn test_numeric_labels_merge_integral_values() {
        let dataset =
            Dataset::from_json_str(r#"[{"g": 1, "y": 1}, {"g": 1.0, "y": 2}, {"g": 1.5, "y": 3}]"#)
                .unwrap();

        let groups = dataset.groups("y", "g");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "1");
        assert_eq!(groups[0].values, vec![1.0, 2.0]);
        assert_eq!(groups[1].label, "1.5");
    }

    #[test]
    fn test_numeric_labels_sorted_by_value() {
        let dataset = Dataset::from_json_str(
            r#"[{"g": 10, "y": 1}, {"g": 2, "y": 2}, {"g": 1.5, "y": 3}, {"g": -4, "y": 4}]"#,
        )
        .unwrap();

        let labels: Vec<String> = dataset
            .groups("y", "g")
            .into_iter()
            .map(|g| g.label)
            .collect();
        assert_eq!(labels, vec!["-4", "1.5", "2", "10"]);
    }

    #[test]
    fn test_mixed_labels_sorted_as_text() {
        let dataset = Dataset::from_json_str(
            r#"[{"g": 10, "y": 1}, {"g": 2, "y": 2}, {"g": "B", "y": 3}]"#,
        )
        .unwrap();

        let labels: Vec<String> = dataset
            .groups("y", "g")
            .into_iter()
            .map(|g| g.label)
            .collect();
        assert_eq!(labels, vec!["10", "2", "B"]);
    }
}
