// Query Parameters and Result Cursor
// Typed bind values and the materialized cursor handed to result handlers

use crate::db::traits::{CellValue, ColumnInfo, DatabaseError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A value bound to a `?` / `:n` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Integer(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Integer(v as i64)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Boolean(v)
    }
}

impl From<NaiveDate> for Param {
    fn from(v: NaiveDate) -> Self {
        Param::Date(v)
    }
}

impl TryFrom<CellValue> for Param {
    type Error = DatabaseError;

    fn try_from(value: CellValue) -> Result<Self, Self::Error> {
        match value {
            CellValue::String(v) => Ok(Param::Text(v)),
            CellValue::Int(v) => Ok(Param::Integer(v)),
            CellValue::Float(v) => Ok(Param::Float(v)),
            CellValue::Bool(v) => Ok(Param::Boolean(v)),
            CellValue::DateTime(s) => parse_date_cell(&s)
                .map(Param::Date)
                .ok_or_else(|| DatabaseError::UnsupportedParameterType(format!("datetime '{}'", s))),
            other => Err(DatabaseError::UnsupportedParameterType(
                other.type_name().to_string(),
            )),
        }
    }
}

/// A plain date, or a timestamp at midnight as Oracle reports DATE columns.
/// Any other time of day would be truncated by a date bind and is refused.
fn parse_date_cell(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .filter(|dt| dt.time() == NaiveTime::MIN)
        .map(|dt| dt.date())
}

/// Parses the `type:value` form used on the command line,
/// e.g. `int:42`, `text:abc`, `date:2024-01-31`
impl FromStr for Param {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| DatabaseError::UnsupportedParameterType(format!("'{}' has no type prefix", s)))?;

        let invalid = |e: &dyn fmt::Display| {
            DatabaseError::QueryError(format!("Invalid {} parameter '{}': {}", kind, value, e))
        };

        match kind.to_ascii_lowercase().as_str() {
            "text" | "str" | "string" => Ok(Param::Text(value.to_string())),
            "int" | "integer" => value.parse().map(Param::Integer).map_err(|e| invalid(&e)),
            "float" | "double" => value.parse().map(Param::Float).map_err(|e| invalid(&e)),
            "bool" | "boolean" => value.parse().map(Param::Boolean).map_err(|e| invalid(&e)),
            "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(Param::Date)
                .map_err(|e| invalid(&e)),
            other => Err(DatabaseError::UnsupportedParameterType(other.to_string())),
        }
    }
}

/// Convert loosely typed values into bind parameters, failing on the first unsupported one
pub fn bind_values(values: Vec<CellValue>) -> Result<Vec<Param>, DatabaseError> {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            Param::try_from(value).map_err(|e| match e {
                DatabaseError::UnsupportedParameterType(kind) => {
                    DatabaseError::UnsupportedParameterType(format!("{} at position {}", kind, idx + 1))
                }
                other => other,
            })
        })
        .collect()
}

/// Fully fetched result of one statement, read row by row through a cursor
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<CellValue>>,
    #[serde(skip)]
    cursor: Option<usize>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns,
            rows,
            cursor: None,
        }
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Move to the next row. Returns `false` once the rows are exhausted.
    pub fn next_row(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.rows.len() {
            self.cursor = Some(next);
            true
        } else {
            self.cursor = Some(self.rows.len());
            false
        }
    }

    /// Rewind so the next `next_row` lands on the first row
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    fn current(&self) -> Option<&Vec<CellValue>> {
        self.cursor.and_then(|c| self.rows.get(c))
    }

    /// Position of a column by label, ignoring case
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(label))
    }

    /// Value at `index` (0-based) in the current row
    pub fn get_index(&self, index: usize) -> Option<&CellValue> {
        self.current().and_then(|row| row.get(index))
    }

    /// Value of column `label` in the current row
    pub fn get(&self, label: &str) -> Option<&CellValue> {
        self.column_index(label).and_then(|idx| self.get_index(idx))
    }

    /// String form of column `label`; `None` for SQL NULL or an unknown column
    pub fn get_string(&self, label: &str) -> Option<String> {
        self.get(label)
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let columns = vec![
            ColumnInfo {
                name: "COLUMN1".to_string(),
                data_type: "varchar".to_string(),
                ordinal_position: 0,
            },
            ColumnInfo {
                name: "column2".to_string(),
                data_type: "int".to_string(),
                ordinal_position: 1,
            },
        ];
        let rows = vec![
            vec![CellValue::String("a".to_string()), CellValue::Int(1)],
            vec![CellValue::String("b".to_string()), CellValue::Null],
        ];
        ResultSet::new(columns, rows)
    }

    #[test]
    fn test_cursor_walks_rows() {
        let mut rs = sample();
        assert!(rs.get("column1").is_none());

        assert!(rs.next_row());
        assert_eq!(rs.get_string("column1").as_deref(), Some("a"));
        assert_eq!(rs.get("COLUMN2"), Some(&CellValue::Int(1)));

        assert!(rs.next_row());
        assert_eq!(rs.get_string("column2"), None);

        assert!(!rs.next_row());
        assert!(!rs.next_row());
        assert!(rs.get_index(0).is_none());

        rs.reset();
        assert!(rs.next_row());
        assert_eq!(rs.get_string("column1").as_deref(), Some("a"));
    }

    #[test]
    fn test_empty_result_set() {
        let mut rs = ResultSet::default();
        assert!(!rs.next_row());
        assert_eq!(rs.row_count(), 0);
    }

    #[test]
    fn test_binary_value_rejected() {
        let err = Param::try_from(CellValue::Binary(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedParameterType(_)));
    }

    #[test]
    fn test_bind_values_reports_position() {
        let err = bind_values(vec![CellValue::Int(1), CellValue::Null]).unwrap_err();
        match err {
            DatabaseError::UnsupportedParameterType(msg) => assert!(msg.contains("position 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bind_values_accepts_dates() {
        let params = bind_values(vec![
            CellValue::DateTime("2024-02-29".to_string()),
            CellValue::Bool(true),
        ])
        .unwrap();
        assert_eq!(
            params,
            vec![
                Param::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
                Param::Boolean(true),
            ]
        );
    }

    #[test]
    fn test_midnight_timestamp_binds_as_date() {
        let expected = Param::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(
            Param::try_from(CellValue::DateTime("2024-01-02 00:00:00".to_string())).unwrap(),
            expected
        );
        assert_eq!(
            Param::try_from(CellValue::DateTime("2024-01-02 00:00:00.000".to_string())).unwrap(),
            expected
        );
    }

    #[test]
    fn test_timestamp_with_time_rejected() {
        let err = Param::try_from(CellValue::DateTime("2024-01-02 13:45:00".to_string())).unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedParameterType(_)));
        let err = Param::try_from(CellValue::DateTime("12:00:00.000000".to_string())).unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedParameterType(_)));
    }

    #[test]
    fn test_param_from_str() {
        assert_eq!("int:42".parse::<Param>().unwrap(), Param::Integer(42));
        assert_eq!("text:a:b".parse::<Param>().unwrap(), Param::Text("a:b".to_string()));
        assert_eq!("bool:false".parse::<Param>().unwrap(), Param::Boolean(false));
        assert_eq!("float:1.5".parse::<Param>().unwrap(), Param::Float(1.5));
        assert!(matches!(
            "blob:00ff".parse::<Param>(),
            Err(DatabaseError::UnsupportedParameterType(_))
        ));
        assert!(matches!(
            "int:abc".parse::<Param>(),
            Err(DatabaseError::QueryError(_))
        ));
    }

    #[test]
    fn test_date_and_float_from_str() {
        assert_eq!(
            "date:2024-01-31".parse::<Param>().unwrap(),
            Param::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert_eq!("double:-2.25".parse::<Param>().unwrap(), Param::Float(-2.25));
        assert!(matches!("date:bad".parse::<Param>(), Err(DatabaseError::QueryError(_))));
        assert!(matches!("date:2024-02-30".parse::<Param>(), Err(DatabaseError::QueryError(_))));
        assert!(matches!("float:x".parse::<Param>(), Err(DatabaseError::QueryError(_))));
        assert!(matches!(
            "nocolon".parse::<Param>(),
            Err(DatabaseError::UnsupportedParameterType(_))
        ));
    }
}
