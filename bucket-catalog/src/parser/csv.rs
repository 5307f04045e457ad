use super::{DecodeStrategy, ParseError, ParsedTable};
use bytes::Bytes;
use datafusion::arrow::csv::reader::{Format, ReaderBuilder};
use std::io::Cursor;
use std::sync::Arc;

/// Delimited text with a header row, decoded by the arrow csv reader.
#[derive(Debug, Clone, Copy)]
pub struct CsvStrategy {
    delimiter: u8,
}

impl CsvStrategy {
    pub fn comma() -> Self {
        Self { delimiter: b',' }
    }

    pub fn tab() -> Self {
        Self { delimiter: b'\t' }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl DecodeStrategy for CsvStrategy {
    fn name(&self) -> &str {
        "arrow-csv"
    }

    fn decode(&self, content: &Bytes) -> Result<ParsedTable, ParseError> {
        if content.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(ParsedTable::empty());
        }

        let format = Format::default()
            .with_header(true)
            .with_delimiter(self.delimiter);
        // Every record, so a late type change widens the column instead of failing the decode.
        let (schema, _) = format.infer_schema(Cursor::new(content.as_ref()), None)?;
        let schema = Arc::new(schema);

        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_delimiter(self.delimiter)
            .build(Cursor::new(content.as_ref()))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        Ok(ParsedTable::new(schema, batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::datatypes::DataType;

    #[test]
    fn test_infers_types() {
        let table = CsvStrategy::comma()
            .decode(&Bytes::from_static(b"id,price,name,active\n1,2.5,a,true\n2,3.0,b,false\n"))
            .unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.columns(),
            vec![
                ("id".to_string(), DataType::Int64),
                ("price".to_string(), DataType::Float64),
                ("name".to_string(), DataType::Utf8),
                ("active".to_string(), DataType::Boolean),
            ]
        );
    }

    #[test]
    fn test_type_change_late_in_file() {
        let mut content = String::from("id,name\n");
        for i in 0..1500 {
            content.push_str(&format!("{i},n{i}\n"));
        }
        content.push_str("abc,last\n");

        let table = CsvStrategy::comma().decode(&Bytes::from(content)).unwrap();
        assert_eq!(table.num_rows(), 1501);
        assert_eq!(table.columns()[0], ("id".to_string(), DataType::Utf8));
        assert_eq!(table.string_rows(1).unwrap(), vec![vec!["0", "n0"]]);
    }

    #[test]
    fn test_tab_delimited() {
        let table = CsvStrategy::tab()
            .decode(&Bytes::from_static(b"a\tb\nx\t1\n"))
            .unwrap();
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.string_rows(10).unwrap(), vec![vec!["x", "1"]]);
    }

    #[test]
    fn test_empty_content() {
        let table = CsvStrategy::comma().decode(&Bytes::new()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let table = CsvStrategy::comma()
            .decode(&Bytes::from_static(b"id,name\n"))
            .unwrap();
        assert_eq!(table.num_columns(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_ragged_rows_fail() {
        let result = CsvStrategy::comma().decode(&Bytes::from_static(b"a,b\n1,2,3\n"));
        assert!(matches!(result, Err(ParseError::Decode(_))));
    }
}
