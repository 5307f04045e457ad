//! Format parsers that turn raw object bytes into arrow record batches.
//!
//! Each file format is handled by a [`FormatParser`], which holds an ordered
//! list of [`DecodeStrategy`] implementations. Strategies are tried in order
//! and the next one is only attempted when the current one reports
//! [`ParseError::Unavailable`] (the decoder was not compiled in, or the content
//! is in a layout it does not handle, such as an IPC stream given to the IPC
//! file reader). A [`ParseError::Decode`] means the data itself is bad
//! and is returned immediately.
//!
//! [`ParserRegistry`] maps lower-cased file extensions to parsers. New formats
//! are added with [`ParserRegistry::register`] without touching grouping or
//! inference code.

mod avro;
mod csv;
mod ipc;
mod json;
mod parquet;

pub use avro::AvroStrategy;
pub use csv::CsvStrategy;
pub use ipc::{IpcFileStrategy, IpcStreamStrategy};
pub use json::{JsonLayout, JsonStrategy};
pub use parquet::ParquetStrategy;

use bytes::Bytes;
use datafusion::arrow::array::Array;
use datafusion::arrow::datatypes::{DataType, Schema, SchemaRef};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::array_value_to_string;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The decoder cannot run here or does not handle this layout
    #[error("decoder unavailable: {0}")]
    Unavailable(String),

    /// The content could not be decoded
    #[error("failed to decode: {0}")]
    Decode(String),
}

impl From<ArrowError> for ParseError {
    fn from(err: ArrowError) -> Self {
        ParseError::Decode(err.to_string())
    }
}

/// Tabular result of parsing one object.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl ParsedTable {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::new(Arc::new(Schema::empty()), Vec::new())
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    /// Nothing to ingest: no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0 || self.num_columns() == 0
    }

    /// Column names with their native arrow types, in file order.
    pub fn columns(&self) -> Vec<(String, DataType)> {
        self.schema
            .fields()
            .iter()
            .map(|f| (f.name().clone(), f.data_type().clone()))
            .collect()
    }

    /// The first `limit` rows with every cell rendered as a string.
    ///
    /// Nulls render as the empty string.
    pub fn string_rows(&self, limit: usize) -> Result<Vec<Vec<String>>, ParseError> {
        let mut rows = Vec::with_capacity(limit.min(self.num_rows()));

        'batches: for batch in &self.batches {
            for row in 0..batch.num_rows() {
                if rows.len() >= limit {
                    break 'batches;
                }
                let cells = batch
                    .columns()
                    .iter()
                    .map(|column| {
                        if column.is_null(row) {
                            Ok(String::new())
                        } else {
                            array_value_to_string(column, row)
                        }
                    })
                    .collect::<Result<Vec<_>, ArrowError>>()?;
                rows.push(cells);
            }
        }

        Ok(rows)
    }
}

/// One way of decoding a format.
pub trait DecodeStrategy: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and error messages
    fn name(&self) -> &str;

    fn decode(&self, content: &Bytes) -> Result<ParsedTable, ParseError>;
}

/// Parser for one file format, backed by an ordered list of strategies.
#[derive(Debug, Clone)]
pub struct FormatParser {
    format: String,
    strategies: Vec<Arc<dyn DecodeStrategy>>,
}

impl FormatParser {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            strategies: Vec::new(),
        }
    }

    /// Append a strategy; earlier strategies take precedence.
    pub fn with_strategy<S: DecodeStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn parse(&self, content: &Bytes) -> Result<ParsedTable, ParseError> {
        let mut unavailable = Vec::new();

        for strategy in &self.strategies {
            match strategy.decode(content) {
                Ok(table) => return Ok(table),
                Err(ParseError::Unavailable(reason)) => {
                    debug!(
                        format = %self.format,
                        strategy = strategy.name(),
                        reason = %reason,
                        "Decoder unavailable, trying next strategy"
                    );
                    unavailable.push(format!("{}: {}", strategy.name(), reason));
                }
                Err(err) => return Err(err),
            }
        }

        Err(ParseError::Unavailable(format!(
            "no usable decoder for '{}' ({})",
            self.format,
            if unavailable.is_empty() {
                "no strategies registered".to_string()
            } else {
                unavailable.join("; ")
            }
        )))
    }
}

/// Maps file extensions to parsers.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<FormatParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ParserRegistry {
    /// A registry with no formats.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// A registry with every built-in format.
    ///
    /// Feather, arrow and ipc try the IPC file layout first and fall back to
    /// the IPC stream layout. Parquet and avro have a single reader each and
    /// report [`ParseError::Unavailable`] when their feature is off.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();

        registry.register("csv", FormatParser::new("csv").with_strategy(CsvStrategy::comma()));
        registry.register("tsv", FormatParser::new("tsv").with_strategy(CsvStrategy::tab()));
        registry.register(
            "json",
            FormatParser::new("json").with_strategy(JsonStrategy::new(JsonLayout::Document)),
        );
        for ext in ["jsonl", "ndjson"] {
            registry.register(
                ext,
                FormatParser::new(ext).with_strategy(JsonStrategy::new(JsonLayout::Lines)),
            );
        }
        registry.register(
            "parquet",
            FormatParser::new("parquet").with_strategy(ParquetStrategy),
        );
        for ext in ["feather", "arrow", "ipc"] {
            registry.register(
                ext,
                FormatParser::new(ext)
                    .with_strategy(IpcFileStrategy)
                    .with_strategy(IpcStreamStrategy),
            );
        }
        registry.register("avro", FormatParser::new("avro").with_strategy(AvroStrategy));

        registry
    }

    /// Register (or replace) the parser for an extension.
    pub fn register(&mut self, extension: &str, parser: FormatParser) {
        self.parsers
            .insert(extension.to_lowercase(), Arc::new(parser));
    }

    pub fn get(&self, extension: &str) -> Option<Arc<FormatParser>> {
        self.parsers.get(&extension.to_lowercase()).cloned()
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.parsers.contains_key(&extension.to_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }
}
