//! Results as structured documents.
//!
//! [`serialize_results`] backs [`format_to`](crate::format_to). A single
//! result is written as itself, several results as a list. Struct results
//! keep their field order in every format.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::result::ResultValue;

/// XML element wrapping several results.
pub const XML_RESULTS_ROOT: &str = "results";

/// XML element of one result.
pub const XML_RESULT_ELEMENT: &str = "result";

/// CSV column used for results that are not structs.
pub const CSV_VALUE_COLUMN: &str = "value";

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("result {index} of type {type_name} has no data representation: {source}")]
    Result {
        index: usize,
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("can't write results as {format}: {message}")]
    Format {
        format: OutputFormat,
        message: String,
    },
}

/// A structured output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Xml,
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Xml => "xml",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "xml" => Ok(OutputFormat::Xml),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!(
                "unknown output format {other:?}, expected json, yaml, xml or csv"
            )),
        }
    }
}

fn failed<E: fmt::Display>(format: OutputFormat) -> impl Fn(E) -> SerializeError {
    move |err| SerializeError::Format {
        format,
        message: err.to_string(),
    }
}

fn result_rows(results: &[ResultValue]) -> Result<Vec<Value>, SerializeError> {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            result.to_json().map_err(|source| SerializeError::Result {
                index,
                type_name: result.result_type().name(),
                source,
            })
        })
        .collect()
}

fn document(rows: Vec<Value>) -> Value {
    match <[Value; 1]>::try_from(rows) {
        Ok([single]) => single,
        Err(rows) => Value::Array(rows),
    }
}

#[derive(Serialize)]
struct XmlResults<'a> {
    #[serde(rename = "result")]
    results: &'a [Value],
}

/// Serializes function results in `format`.
///
/// JSON is indented by two spaces. XML puts a single result in a
/// [`XML_RESULT_ELEMENT`] element and several in [`XML_RESULTS_ROOT`].
/// CSV writes one row per result, or one row per element when the only
/// result is a list; struct fields become columns.
pub fn serialize_results(
    results: &[ResultValue],
    format: OutputFormat,
) -> Result<String, SerializeError> {
    let rows = result_rows(results)?;
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&document(rows)).map_err(failed(format)),
        OutputFormat::Yaml => serde_yaml::to_string(&document(rows)).map_err(failed(format)),
        OutputFormat::Xml => match rows.as_slice() {
            [single] => quick_xml::se::to_string_with_root(XML_RESULT_ELEMENT, single)
                .map_err(failed(format)),
            _ => quick_xml::se::to_string_with_root(
                XML_RESULTS_ROOT,
                &XmlResults { results: &rows },
            )
            .map_err(failed(format)),
        },
        OutputFormat::Csv => csv_table(rows),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        nested => nested.to_string(),
    }
}

fn csv_failed(err: impl fmt::Display) -> SerializeError {
    failed(OutputFormat::Csv)(err)
}

fn csv_table(rows: Vec<Value>) -> Result<String, SerializeError> {
    let rows = match <[Value; 1]>::try_from(rows) {
        Ok([Value::Array(items)]) => items,
        Ok([single]) => vec![single],
        Err(rows) => rows,
    };
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };

    // columns come from the first row
    let columns: Vec<String> = match first {
        Value::Object(fields) => fields.keys().cloned().collect(),
        _ => vec![CSV_VALUE_COLUMN.to_string()],
    };

    let mut table = csv::Writer::from_writer(Vec::new());
    table.write_record(&columns).map_err(csv_failed)?;
    for row in &rows {
        let record: Vec<String> = match row {
            Value::Object(fields) => columns
                .iter()
                .map(|column| fields.get(column).map(cell).unwrap_or_default())
                .collect(),
            scalar => std::iter::once(cell(scalar))
                .chain(std::iter::repeat(String::new()))
                .take(columns.len())
                .collect(),
        };
        table.write_record(&record).map_err(csv_failed)?;
    }

    let bytes = table.into_inner().map_err(csv_failed)?;
    String::from_utf8(bytes).map_err(csv_failed)
}
