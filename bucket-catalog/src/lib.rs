// Bucket cataloging: parse representative files of grouped tables and publish them to a catalog

pub mod config;
pub mod error;
pub mod ingest;
#[cfg(feature = "metadata-api")]
pub mod metadata_api;
pub mod observer;
pub mod parser;
pub mod schema;
pub mod sink;
pub mod source;

pub use config::IngestConfig;
pub use error::{Error, Result};
pub use ingest::{
    schema_name_for, FailureScope, IngestFailure, IngestReport, IngestedTable, Ingestor,
    SkipReason, SkippedTable,
};
#[cfg(feature = "metadata-api")]
pub use metadata_api::MetadataApiClient;
pub use observer::{IngestObserver, TracingObserver};
pub use parser::{DecodeStrategy, FormatParser, ParseError, ParsedTable, ParserRegistry};
pub use schema::{arrow_to_semantic_type, Column, InferredSchema, SchemaInferencer, SemanticType, TableSample};
pub use sink::{CatalogSink, CreateTableRequest, EntityRef, InMemoryCatalog, StoredTable, TableType};
pub use source::{ObjectSource, ObjectStoreSource};
