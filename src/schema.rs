//! Live schema and parameter sources consumed by the resolver.

use crate::error::{BindingError, ChartResult};
use crate::field::DataType;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub cube: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            cube: false,
        }
    }
}

/// Columns currently available for a query.
pub trait SchemaSource {
    fn columns_for(&self, query: &str) -> Vec<ColumnMeta>;

    fn column(&self, query: &str, name: &str) -> Option<ColumnMeta> {
        self.columns_for(query)
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Single(s) => vec![s.as_str()],
            ParamValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Text used when the value is spliced into a script template.
    pub fn as_text(&self) -> String {
        self.values().join(",")
    }
}

/// Parameter/variable table.
pub trait ParameterTable {
    fn lookup(&self, name: &str) -> Option<ParamValue>;
}

impl ParameterTable for HashMap<String, ParamValue> {
    fn lookup(&self, name: &str) -> Option<ParamValue> {
        self.get(name).cloned()
    }
}

/// Parameters read from a JSON object of strings, numbers or string arrays.
pub fn params_from_json(value: &Value) -> ChartResult<HashMap<String, ParamValue>> {
    let obj = value
        .as_object()
        .ok_or_else(|| BindingError::Parse("parameters must be a JSON object".to_string()))?;

    let mut params = HashMap::new();
    for (key, val) in obj {
        let param = match val {
            Value::String(s) => ParamValue::Single(s.clone()),
            Value::Number(n) => ParamValue::Single(n.to_string()),
            Value::Bool(b) => ParamValue::Single(b.to_string()),
            Value::Array(items) => ParamValue::List(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => {
                return Err(BindingError::Parse(format!(
                    "unsupported value type for parameter '{}'",
                    key
                )))
            }
        };
        params.insert(key.clone(), param);
    }
    Ok(params)
}

/// In-memory schema keyed by query name.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    queries: HashMap<String, Vec<ColumnMeta>>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>, columns: Vec<ColumnMeta>) -> Self {
        self.queries.insert(query.into(), columns);
        self
    }

    pub fn set_columns(&mut self, query: impl Into<String>, columns: Vec<ColumnMeta>) {
        self.queries.insert(query.into(), columns);
    }
}

impl SchemaSource for MemorySchema {
    fn columns_for(&self, query: &str) -> Vec<ColumnMeta> {
        self.queries.get(query).cloned().unwrap_or_default()
    }
}

/// Schema of a single CSV sample. Column types are inferred from the sampled
/// rows; every query name maps to the same columns.
#[derive(Debug, Clone)]
pub struct CsvSchema {
    columns: Vec<ColumnMeta>,
}

const SAMPLE_ROWS: usize = 100;

impl CsvSchema {
    pub fn from_reader<R: Read>(reader: R) -> ChartResult<Self> {
        let schema_err = |reason: String| BindingError::Schema {
            query: "csv".to_string(),
            reason,
        };

        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| schema_err(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.is_empty() {
            return Err(schema_err("CSV has no header row".to_string()));
        }

        let mut samples: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records().take(SAMPLE_ROWS) {
            let record = record.map_err(|e| schema_err(e.to_string()))?;
            for (idx, value) in record.iter().enumerate().take(headers.len()) {
                if !value.trim().is_empty() {
                    samples[idx].push(value.trim().to_string());
                }
            }
        }

        let columns = headers
            .into_iter()
            .zip(samples)
            .map(|(name, values)| ColumnMeta::new(name, infer_data_type(&values)))
            .collect();

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }
}

impl SchemaSource for CsvSchema {
    fn columns_for(&self, _query: &str) -> Vec<ColumnMeta> {
        self.columns.clone()
    }
}

/// Narrowest type every sampled value parses as. No samples means string.
pub fn infer_data_type(values: &[String]) -> DataType {
    if values.is_empty() {
        return DataType::String;
    }
    let all = |pred: fn(&str) -> bool| values.iter().all(|v| pred(v));

    if all(|v| v.parse::<i64>().is_ok()) {
        DataType::Integer
    } else if all(|v| v.parse::<f64>().is_ok()) {
        DataType::Double
    } else if all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
        DataType::Boolean
    } else if all(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok()) {
        DataType::Date
    } else if all(|v| NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S").is_ok())
    {
        DataType::TimeInstant
    } else if all(|v| NaiveTime::parse_from_str(v, "%H:%M:%S").is_ok()) {
        DataType::Time
    } else {
        DataType::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_schema_infers_types() {
        let csv = "\
Region,Sales,OrderDate,Shipped
East,10.5,2024-01-03,2024-01-05 10:00:00
West,3,2024-02-11,2024-02-12 08:30:00
";
        let schema = CsvSchema::from_reader(csv.as_bytes()).unwrap();
        let types: Vec<DataType> = schema.columns().iter().map(|c| c.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::String, DataType::Double, DataType::Date, DataType::TimeInstant]
        );
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let schema = MemorySchema::new()
            .with_query("orders", vec![ColumnMeta::new("Sales", DataType::Double)]);
        assert!(schema.column("orders", "sales").is_some());
        assert!(schema.column("returns", "sales").is_none());
    }

    #[test]
    fn test_params_from_json() {
        let value = serde_json::json!({"year": 2024, "measures": ["Sales", "Profit"]});
        let params = params_from_json(&value).unwrap();
        assert_eq!(params.lookup("year"), Some(ParamValue::Single("2024".to_string())));
        assert_eq!(params.lookup("measures").unwrap().values(), vec!["Sales", "Profit"]);
    }

    #[test]
    fn test_params_reject_non_object() {
        assert!(params_from_json(&serde_json::json!([1, 2])).is_err());
    }
}
