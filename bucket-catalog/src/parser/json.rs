use super::{DecodeStrategy, ParseError, ParsedTable};
use bytes::Bytes;
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::json::reader::infer_json_schema_from_iterator;
use datafusion::arrow::json::ReaderBuilder;
use serde_json::Value;
use std::sync::Arc;

/// How records are laid out in a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    /// A top-level array of records, a single record, or whitespace separated records
    Document,
    /// One record per line
    Lines,
}

/// JSON records decoded through `serde_json` and the arrow json decoder.
#[derive(Debug, Clone, Copy)]
pub struct JsonStrategy {
    layout: JsonLayout,
}

impl JsonStrategy {
    pub fn new(layout: JsonLayout) -> Self {
        Self { layout }
    }

    fn records(&self, text: &str) -> Result<Vec<Value>, ParseError> {
        match self.layout {
            JsonLayout::Document => document_records(text),
            JsonLayout::Lines => line_records(text),
        }
    }
}

impl DecodeStrategy for JsonStrategy {
    fn name(&self) -> &str {
        match self.layout {
            JsonLayout::Document => "arrow-json",
            JsonLayout::Lines => "arrow-json-lines",
        }
    }

    fn decode(&self, content: &Bytes) -> Result<ParsedTable, ParseError> {
        let text = std::str::from_utf8(content)
            .map_err(|e| ParseError::Decode(format!("invalid UTF-8: {}", e)))?;
        let records = self.records(text)?;
        records_to_table(&records)
    }
}

fn document_records(text: &str) -> Result<Vec<Value>, ParseError> {
    let mut values = serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ParseError::Decode(e.to_string()))?;

    if let [Value::Array(_)] = values.as_slice() {
        if let Some(Value::Array(items)) = values.pop() {
            values = items;
        }
    }
    ensure_objects(values)
}

fn line_records(text: &str) -> Result<Vec<Value>, ParseError> {
    let values = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<Value>(line)
                .map_err(|e| ParseError::Decode(format!("line {}: {}", idx + 1, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    ensure_objects(values)
}

fn ensure_objects(values: Vec<Value>) -> Result<Vec<Value>, ParseError> {
    match values.iter().position(|v| !v.is_object()) {
        Some(idx) => Err(ParseError::Decode(format!(
            "record {} is not a JSON object",
            idx + 1
        ))),
        None => Ok(values),
    }
}

fn records_to_table(records: &[Value]) -> Result<ParsedTable, ParseError> {
    if records.is_empty() {
        return Ok(ParsedTable::empty());
    }

    let schema = Arc::new(infer_json_schema_from_iterator(
        records.iter().map(Ok::<_, ArrowError>),
    )?);
    // Inference widens mixed number/string fields to Utf8; coerce the numbers.
    let mut decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(records.len())
        .with_coerce_primitive(true)
        .build_decoder()?;
    decoder.serialize(records)?;
    let batches = decoder.flush()?.into_iter().collect();

    Ok(ParsedTable::new(schema, batches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::datatypes::DataType;

    fn document(text: &'static str) -> Result<ParsedTable, ParseError> {
        JsonStrategy::new(JsonLayout::Document).decode(&Bytes::from_static(text.as_bytes()))
    }

    #[test]
    fn test_array_of_records() {
        let table = document(r#"[{"id": 1, "name": "a"}, {"id": 2, "name": null}]"#).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.columns(),
            vec![
                ("id".to_string(), DataType::Int64),
                ("name".to_string(), DataType::Utf8),
            ]
        );
        assert_eq!(
            table.string_rows(5).unwrap(),
            vec![vec!["1", "a"], vec!["2", ""]]
        );
    }

    #[test]
    fn test_mixed_number_and_string_field() {
        let table = document(r#"[{"a": 1}, {"a": "x"}, {"a": 2.5}]"#).unwrap();
        assert_eq!(table.columns(), vec![("a".to_string(), DataType::Utf8)]);
        assert_eq!(
            table.string_rows(5).unwrap(),
            vec![vec!["1"], vec!["x"], vec!["2.5"]]
        );

        let lines = JsonStrategy::new(JsonLayout::Lines)
            .decode(&Bytes::from_static(b"{\"code\": \"A1\"}\n{\"code\": 7}\n"))
            .unwrap();
        assert_eq!(lines.num_rows(), 2);
        assert_eq!(lines.string_rows(5).unwrap(), vec![vec!["A1"], vec!["7"]]);
    }

    #[test]
    fn test_single_record() {
        let table = document(r#"{"score": 0.5, "ok": true}"#).unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.num_columns(), 2);
    }

    #[test]
    fn test_document_accepts_newline_delimited() {
        let table = document("{\"a\": 1}\n{\"a\": 2}\n").unwrap();
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_lines_layout() {
        let strategy = JsonStrategy::new(JsonLayout::Lines);
        let table = strategy
            .decode(&Bytes::from_static(b"{\"a\": 1}\n\n{\"a\": 2, \"b\": \"x\"}\n"))
            .unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 2);

        let err = strategy
            .decode(&Bytes::from_static(b"{\"a\": 1}\nnot json\n"))
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(document("").unwrap().is_empty());
        assert!(document("[]").unwrap().is_empty());
        assert!(matches!(document("[1, 2]"), Err(ParseError::Decode(_))));
        assert!(matches!(document("{\"a\": "), Err(ParseError::Decode(_))));
    }
}
