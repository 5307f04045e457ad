//! Ingestion pass: list a bucket, group keys into logical tables, infer each
//! table's schema from its representative file and write the result to a
//! catalog sink.

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::observer::{IngestObserver, TracingObserver};
use crate::parser::ParserRegistry;
use crate::schema::SchemaInferencer;
use crate::sink::{CatalogSink, CreateTableRequest, EntityRef, TableType};
use crate::source::ObjectSource;
use bucket_layout::{describe, tags_for, FolderStructure, GroupingSummary, TableGroup, TableGrouper};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Schema used for groups whose representative file sits at the bucket root.
pub const DEFAULT_SCHEMA_NAME: &str = "default";

/// Why a table group produced no catalog entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No parser is registered for the extension
    UnsupportedFormat(String),
    /// The representative object vanished between listing and fetch
    MissingBody(String),
    /// The representative file has no rows or no columns
    EmptyTable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedFormat(format) => write!(f, "unsupported format '{}'", format),
            SkipReason::MissingBody(key) => write!(f, "object '{}' not found", key),
            SkipReason::EmptyTable => f.write_str("no rows or columns to ingest"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// One table group failed; the pass continued
    Table,
    /// Listing or bootstrap failed; the pass stopped
    Pass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestFailure {
    pub scope: FailureScope,
    /// Table name, or the bucket name for pass-level failures
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedTable {
    pub name: String,
    pub fully_qualified_name: String,
    pub columns: usize,
    pub sample_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTable {
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of an ingestion pass, sorted by table name.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub bucket: String,
    pub summary: GroupingSummary,
    pub ingested: Vec<IngestedTable>,
    pub skipped: Vec<SkippedTable>,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            ..Default::default()
        }
    }

    fn record_pass_failure(&mut self, err: &Error) {
        error!(bucket = %self.bucket, error = %err, "Ingestion pass aborted");
        self.failures.push(IngestFailure {
            scope: FailureScope::Pass,
            name: self.bucket.clone(),
            message: err.to_string(),
        });
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn aborted(&self) -> bool {
        self.failures.iter().any(|f| f.scope == FailureScope::Pass)
    }

    pub fn ingested_names(&self) -> Vec<&str> {
        self.ingested
            .iter()
            .map(|t| t.fully_qualified_name.as_str())
            .collect()
    }

    fn sort(&mut self) {
        self.ingested.sort_by(|a, b| a.name.cmp(&b.name));
        self.skipped.sort_by(|a, b| a.name.cmp(&b.name));
        self.failures
            .sort_by(|a, b| (a.scope as u8, &a.name).cmp(&(b.scope as u8, &b.name)));
    }
}

/// Schema name for a group: the table name for hierarchical tables, otherwise
/// the first folder of the representative file.
pub fn schema_name_for(group: &TableGroup) -> String {
    if group.folder_structure == FolderStructure::Hierarchical {
        return group.name.clone();
    }

    group
        .representative_file()
        .and_then(|path| path.rsplit_once('/'))
        .and_then(|(dir, _)| dir.split('/').next())
        .filter(|first| !first.is_empty())
        .unwrap_or(DEFAULT_SCHEMA_NAME)
        .to_string()
}

enum GroupOutcome {
    Ingested(IngestedTable),
    Skipped(SkippedTable),
}

enum GroupError {
    Table(Error),
    Pass(Error),
}

fn table_error<E: Into<Error>>(err: E) -> GroupError {
    GroupError::Table(err.into())
}

/// Schema entities memoised per name, created at most once per pass.
struct SchemaCache<'a> {
    sink: &'a dyn CatalogSink,
    database: EntityRef,
    cells: Mutex<HashMap<String, Arc<OnceCell<EntityRef>>>>,
}

impl<'a> SchemaCache<'a> {
    fn new(sink: &'a dyn CatalogSink, database: EntityRef) -> Self {
        Self {
            sink,
            database,
            cells: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, name: &str) -> Result<EntityRef> {
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .map_err(|_| Error::Internal("schema cache lock poisoned".to_string()))?;
            cells.entry(name.to_string()).or_default().clone()
        };

        cell.get_or_try_init(|| self.sink.get_or_create_schema(&self.database, name))
            .await
            .cloned()
    }
}

/// Runs ingestion passes for one bucket.
///
/// # Example
/// ```no_run
/// use bucket_catalog::{IngestConfig, Ingestor, InMemoryCatalog, ObjectStoreSource};
/// use std::sync::Arc;
///
/// # async fn example() -> bucket_catalog::Result<()> {
/// let source = ObjectStoreSource::local("landing", "/data/landing")?;
/// let catalog = Arc::new(InMemoryCatalog::new());
/// let ingestor = Ingestor::new(IngestConfig::new("landing"), Arc::new(source), catalog.clone());
///
/// let report = ingestor.run().await?;
/// println!("ingested {} tables", report.ingested.len());
/// # Ok(())
/// # }
/// ```
pub struct Ingestor {
    config: IngestConfig,
    source: Arc<dyn ObjectSource>,
    sink: Arc<dyn CatalogSink>,
    parsers: Arc<ParserRegistry>,
    observer: Arc<dyn IngestObserver>,
}

impl Ingestor {
    pub fn new(
        config: IngestConfig,
        source: Arc<dyn ObjectSource>,
        sink: Arc<dyn CatalogSink>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
            parsers: Arc::new(ParserRegistry::with_defaults()),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = Arc::new(parsers);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// List the bucket and return how many objects it holds.
    pub async fn test_connection(&self) -> Result<usize> {
        self.config.validate()?;
        let keys = self.source.list_objects(self.config.bucket_name()).await?;
        info!(
            bucket = self.config.bucket_name(),
            objects = keys.len(),
            "Connection test succeeded"
        );
        Ok(keys.len())
    }

    /// Run one ingestion pass.
    ///
    /// # Errors
    /// Only configuration problems are returned as errors. Listing and
    /// bootstrap failures end the pass and are recorded in the report with
    /// [`FailureScope::Pass`]; per-table failures are recorded with
    /// [`FailureScope::Table`] and do not stop other tables.
    pub async fn run(&self) -> Result<IngestReport> {
        self.config.validate()?;
        let grouper = TableGrouper::new(self.config.scan())?;
        let bucket = self.config.bucket_name();
        let mut report = IngestReport::new(bucket);

        info!(
            bucket = bucket,
            service = self.config.service_name(),
            workers = self.config.max_workers(),
            "Starting ingestion pass"
        );

        let (database, keys) = match self.bootstrap().await {
            Ok(bootstrap) => bootstrap,
            Err(err) => {
                report.record_pass_failure(&err);
                return Ok(report);
            }
        };
        self.observer.on_listing(bucket, keys.len());

        let grouping = grouper.group(&keys);
        report.summary = grouping.summary.clone();

        let schemas = SchemaCache::new(self.sink.as_ref(), database);
        let inferencer = SchemaInferencer::new(self.parsers.clone(), self.config.scan().sample_size());

        let mut outcomes = stream::iter(grouping.into_groups())
            .map(|group| self.ingest_group(group, &schemas, &inferencer))
            .buffer_unordered(self.config.max_workers());

        while let Some((name, outcome)) = outcomes.next().await {
            match outcome {
                Ok(GroupOutcome::Ingested(table)) => report.ingested.push(table),
                Ok(GroupOutcome::Skipped(skipped)) => report.skipped.push(skipped),
                Err(GroupError::Table(err)) => report.failures.push(IngestFailure {
                    scope: FailureScope::Table,
                    name,
                    message: err.to_string(),
                }),
                Err(GroupError::Pass(err)) => {
                    report.record_pass_failure(&err);
                    break;
                }
            }
        }

        report.sort();
        info!(
            bucket = bucket,
            ingested = report.ingested.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Ingestion pass finished"
        );
        Ok(report)
    }

    /// Service and database entities, then the full bucket listing.
    async fn bootstrap(&self) -> Result<(EntityRef, Vec<String>)> {
        let service = self
            .sink
            .get_or_create_service(self.config.service_name())
            .await?;
        let database = self
            .sink
            .get_or_create_database(&service, self.config.bucket_name())
            .await?;
        let keys = self.source.list_objects(self.config.bucket_name()).await?;
        Ok((database, keys))
    }

    async fn ingest_group(
        &self,
        group: TableGroup,
        schemas: &SchemaCache<'_>,
        inferencer: &SchemaInferencer,
    ) -> (String, std::result::Result<GroupOutcome, GroupError>) {
        self.observer.on_table_grouped(&group);

        let outcome = self.try_ingest_group(&group, schemas, inferencer).await;
        match &outcome {
            Ok(GroupOutcome::Ingested(table)) => self
                .observer
                .on_table_ingested(&table.name, &table.fully_qualified_name),
            Ok(GroupOutcome::Skipped(skipped)) => {
                self.observer.on_table_skipped(&skipped.name, &skipped.reason)
            }
            Err(GroupError::Table(err)) => {
                self.observer.on_table_failed(&group.name, &err.to_string())
            }
            Err(GroupError::Pass(_)) => {}
        }

        (group.name, outcome)
    }

    async fn try_ingest_group(
        &self,
        group: &TableGroup,
        schemas: &SchemaCache<'_>,
        inferencer: &SchemaInferencer,
    ) -> std::result::Result<GroupOutcome, GroupError> {
        let skip = |reason: SkipReason| -> std::result::Result<GroupOutcome, GroupError> {
            Ok(GroupOutcome::Skipped(SkippedTable {
                name: group.name.clone(),
                reason,
            }))
        };

        let representative = group.representative_file().ok_or_else(|| {
            table_error(Error::Internal(format!(
                "table group '{}' has no files",
                group.name
            )))
        })?;
        let format = group.file_format().unwrap_or_default();

        let Some(parser) = inferencer.parser_for(&format) else {
            return skip(SkipReason::UnsupportedFormat(format));
        };

        let body = match self
            .source
            .get_object_body(self.config.bucket_name(), representative)
            .await
            .map_err(table_error)?
        {
            Some(body) => body,
            None => return skip(SkipReason::MissingBody(representative.to_string())),
        };

        debug!(
            table = %group.name,
            key = representative,
            bytes = body.len(),
            format = %format,
            "Parsing representative file"
        );
        let parsed = tokio::task::spawn_blocking(move || parser.parse(&body))
            .await
            .map_err(|e| table_error(Error::Internal(format!("parser task failed: {}", e))))?
            .map_err(table_error)?;

        let Some(inferred) = inferencer
            .infer(&parsed, group.partition_keys())
            .map_err(table_error)?
        else {
            return skip(SkipReason::EmptyTable);
        };

        let schema = schemas
            .get(&schema_name_for(group))
            .await
            .map_err(GroupError::Pass)?;

        let request = CreateTableRequest {
            name: group.name.clone(),
            database_schema: schema.fully_qualified_name.clone(),
            columns: inferred.columns,
            tags: tags_for(
                self.config.scan(),
                representative,
                group.folder_structure,
                group.subfolders.len(),
            ),
            description: describe(group, &format),
            file_format: format,
            table_type: TableType::Regular,
        };

        let table = self
            .sink
            .create_or_update_table(&request)
            .await
            .map_err(table_error)?;
        self.sink
            .ingest_sample_data(&table, &inferred.sample)
            .await
            .map_err(table_error)?;

        Ok(GroupOutcome::Ingested(IngestedTable {
            name: group.name.clone(),
            fully_qualified_name: table.fully_qualified_name,
            columns: request.columns.len(),
            sample_rows: inferred.sample.rows.len(),
        }))
    }
}
