use super::{DecodeStrategy, ParseError, ParsedTable};
use bytes::Bytes;
use datafusion::arrow::ipc::reader::{FileReader, StreamReader};
use std::io::Cursor;

/// Leading magic of the IPC file layout.
const FILE_MAGIC: &[u8] = b"ARROW1";

/// Arrow IPC files (Feather v2).
///
/// Content without the file magic is left to the next strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpcFileStrategy;

impl DecodeStrategy for IpcFileStrategy {
    fn name(&self) -> &str {
        "arrow-ipc"
    }

    fn decode(&self, content: &Bytes) -> Result<ParsedTable, ParseError> {
        if !content.starts_with(FILE_MAGIC) {
            return Err(ParseError::Unavailable(
                "content is not in the IPC file layout".to_string(),
            ));
        }
        let reader = FileReader::try_new(Cursor::new(content.clone()), None)?;
        let schema = reader.schema();
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        Ok(ParsedTable::new(schema, batches))
    }
}

/// Arrow IPC streams, as written to `.arrow` by stream writers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpcStreamStrategy;

impl DecodeStrategy for IpcStreamStrategy {
    fn name(&self) -> &str {
        "arrow-ipc-stream"
    }

    fn decode(&self, content: &Bytes) -> Result<ParsedTable, ParseError> {
        let reader = StreamReader::try_new(Cursor::new(content.clone()), None)?;
        let schema = reader.schema();
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        Ok(ParsedTable::new(schema, batches))
    }
}
