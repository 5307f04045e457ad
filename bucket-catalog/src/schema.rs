use crate::error::Result;
use crate::parser::{FormatParser, ParsedTable, ParserRegistry};
use bucket_layout::config::MAX_SAMPLE_SIZE;
use datafusion::arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Catalog-neutral column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SemanticType {
    String,
    Int,
    Float,
    Boolean,
    Datetime,
    Time,
}

impl SemanticType {
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticType::String => "STRING",
            SemanticType::Int => "INT",
            SemanticType::Float => "FLOAT",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Datetime => "DATETIME",
            SemanticType::Time => "TIME",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "dataType")]
    pub data_type: SemanticType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Stringified preview rows of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Columns and sample produced for one table group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSchema {
    pub columns: Vec<Column>,
    pub sample: TableSample,
}

/// Convert an arrow type to its semantic type; anything unrecognised is STRING.
pub fn arrow_to_semantic_type(data_type: &DataType) -> SemanticType {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => SemanticType::Int,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => SemanticType::Float,
        DataType::Boolean => SemanticType::Boolean,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => SemanticType::Datetime,
        DataType::Time32(_)
        | DataType::Time64(_)
        | DataType::Duration(_)
        | DataType::Interval(_) => SemanticType::Time,
        _ => SemanticType::String,
    }
}

/// Turns parsed representative files into catalog columns and samples.
#[derive(Debug, Clone)]
pub struct SchemaInferencer {
    parsers: Arc<ParserRegistry>,
    sample_size: usize,
}

impl SchemaInferencer {
    pub fn new(parsers: Arc<ParserRegistry>, sample_size: usize) -> Self {
        Self {
            parsers,
            sample_size: sample_size.clamp(1, MAX_SAMPLE_SIZE),
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn parser_for(&self, extension: &str) -> Option<Arc<FormatParser>> {
        self.parsers.get(extension)
    }

    /// Infer columns and a sample.
    ///
    /// Data columns come first in file order, followed by one STRING column
    /// per partition key. Returns `None` when the table has no rows or no
    /// columns and so cannot be ingested.
    pub fn infer<'a, I>(&self, table: &ParsedTable, partition_keys: I) -> Result<Option<InferredSchema>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if table.is_empty() {
            return Ok(None);
        }

        let data_columns = table.columns();
        let mut partition_keys: Vec<&str> = partition_keys.into_iter().collect();
        partition_keys.sort_unstable();
        partition_keys.dedup();

        let mut columns: Vec<Column> = data_columns
            .iter()
            .map(|(name, data_type)| Column::new(name.clone(), arrow_to_semantic_type(data_type)))
            .collect();
        columns.extend(
            partition_keys
                .iter()
                .map(|key| Column::new(*key, SemanticType::String)),
        );

        let sample = TableSample {
            columns: data_columns.into_iter().map(|(name, _)| name).collect(),
            rows: table.string_rows(self.sample_size)?,
        };

        Ok(Some(InferredSchema { columns, sample }))
    }
}
