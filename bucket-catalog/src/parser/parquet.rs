use super::{DecodeStrategy, ParseError, ParsedTable};
use bytes::Bytes;

/// Parquet files decoded with the arrow parquet reader.
///
/// Requires the `parquet` feature (on by default); without it the strategy
/// reports itself unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetStrategy;

impl DecodeStrategy for ParquetStrategy {
    fn name(&self) -> &str {
        "arrow-parquet"
    }

    #[cfg(feature = "parquet")]
    fn decode(&self, content: &Bytes) -> Result<ParsedTable, ParseError> {
        use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let builder = ParquetRecordBatchReaderBuilder::try_new(content.clone())
            .map_err(|e| ParseError::Decode(e.to_string()))?;
        let schema = builder.schema().clone();
        let reader = builder
            .build()
            .map_err(|e| ParseError::Decode(e.to_string()))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        Ok(ParsedTable::new(schema, batches))
    }

    #[cfg(not(feature = "parquet"))]
    fn decode(&self, _content: &Bytes) -> Result<ParsedTable, ParseError> {
        Err(ParseError::Unavailable(
            "built without the `parquet` feature".to_string(),
        ))
    }
}
