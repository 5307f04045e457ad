use super::{DecodeStrategy, ParseError, ParsedTable};
use bytes::Bytes;

/// Avro object container files, via DataFusion's avro reader.
///
/// Only usable with the `avro` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvroStrategy;

impl DecodeStrategy for AvroStrategy {
    fn name(&self) -> &str {
        "datafusion-avro"
    }

    #[cfg(feature = "avro")]
    fn decode(&self, content: &Bytes) -> Result<ParsedTable, ParseError> {
        use datafusion::datasource::avro_to_arrow::ReaderBuilder;
        use std::io::Cursor;

        const AVRO_BATCH_SIZE: usize = 8192;

        let reader = ReaderBuilder::new()
            .read_schema()
            .with_batch_size(AVRO_BATCH_SIZE)
            .build(Cursor::new(content.clone()))
            .map_err(|e| ParseError::Decode(e.to_string()))?;
        let schema = reader.schema();
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        Ok(ParsedTable::new(schema, batches))
    }

    #[cfg(not(feature = "avro"))]
    fn decode(&self, _content: &Bytes) -> Result<ParsedTable, ParseError> {
        Err(ParseError::Unavailable(
            "built without the `avro` feature".to_string(),
        ))
    }
}
