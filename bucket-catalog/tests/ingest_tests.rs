use async_trait::async_trait;
use bucket_catalog::{
    CatalogSink, CreateTableRequest, EntityRef, Error, FailureScope, InMemoryCatalog,
    IngestConfig, IngestObserver, Ingestor, ObjectSource, ObjectStoreSource, SkipReason,
    TableSample,
};
use bucket_layout::{ScanConfig, TagRule};
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const BUCKET: &str = "landing";

async fn memory_bucket(files: &[(&str, &[u8])]) -> Arc<ObjectStoreSource> {
    let store = InMemory::new();
    for (key, body) in files {
        store
            .put(&Path::from(*key), PutPayload::from(body.to_vec()))
            .await
            .unwrap();
    }
    Arc::new(ObjectStoreSource::new().with_bucket(BUCKET, Arc::new(store)))
}

fn ingestor(
    config: IngestConfig,
    source: Arc<dyn ObjectSource>,
    catalog: Arc<dyn CatalogSink>,
) -> Ingestor {
    Ingestor::new(config, source, catalog)
}

const ORDERS: &[u8] = b"id,amount\n1,9.5\n2,3.0\n";

#[tokio::test]
async fn test_ingests_grouped_tables() {
    let source = memory_bucket(&[
        ("orders.csv", ORDERS),
        ("orders/part1.csv", ORDERS),
        ("sales/2023/region=US/data.csv", ORDERS),
        ("sales/2023/region=EU/data.csv", ORDERS),
        ("events.json", br#"[{"kind": "click", "n": 1}, {"kind": "view", "n": 2}]"#),
        ("notes.txt", b"hello"),
        ("empty.csv", b"id,name\n"),
    ])
    .await;
    let catalog = Arc::new(InMemoryCatalog::new());

    let report = ingestor(IngestConfig::new(BUCKET), source, catalog.clone())
        .run()
        .await
        .unwrap();

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.summary.keys_seen, 7);
    assert_eq!(report.summary.unsupported_format, 1);
    assert_eq!(
        report.ingested_names(),
        [
            "s3_catalog.landing.default.events",
            "s3_catalog.landing.orders.orders",
            "s3_catalog.landing.sales.sales",
        ]
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "empty");
    assert_eq!(report.skipped[0].reason, SkipReason::EmptyTable);
    assert_eq!(catalog.table_names().len(), 3);

    let sales = catalog.table("s3_catalog.landing.sales.sales").unwrap();
    let columns: Vec<&str> = sales.request.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, ["id", "amount", "region"]);
    assert_eq!(sales.request.file_format, "csv");
    assert_eq!(sales.request.table_type.as_str(), "Regular");
    assert!(sales
        .request
        .description
        .starts_with("**Partitioned Structure Table**"));

    let sample = sales.sample.unwrap();
    assert_eq!(sample.columns, ["id", "amount"]);
    assert_eq!(sample.rows.len(), 2);
    assert!(sample.rows.iter().all(|row| row.len() == 2));

    let orders = catalog.table("s3_catalog.landing.orders.orders").unwrap();
    assert!(orders.request.description.contains("- **Files**: 2 CSV file(s)"));
}

#[tokio::test]
async fn test_path_rule_and_structural_tags() {
    let source = memory_bucket(&[("users/pii/data.csv", b"email\na@example.com\n")]).await;
    let catalog = Arc::new(InMemoryCatalog::new());
    let config = IngestConfig::new(BUCKET).with_scan(
        ScanConfig::new()
            .with_tag_rule(TagRule::new("pii", "PII.Sensitive"))
            .with_default_tag("Source.ObjectStore"),
    );

    let report = ingestor(config, source, catalog.clone()).run().await.unwrap();
    assert_eq!(report.ingested.len(), 1);

    let users = catalog.table("s3_catalog.landing.users.users").unwrap();
    let tags: Vec<&str> = users.request.tags.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(
        tags,
        [
            "PII.Sensitive",
            "Source.ObjectStore",
            "Structure.Hierarchical",
            "Complexity.Simple",
        ]
    );
}

#[tokio::test]
async fn test_rerun_updates_instead_of_duplicating() {
    let source = memory_bucket(&[("orders.csv", ORDERS), ("events/a.csv", ORDERS)]).await;
    let catalog = Arc::new(InMemoryCatalog::new());
    let ingestor = ingestor(IngestConfig::new(BUCKET), source, catalog.clone());

    let first = ingestor.run().await.unwrap();
    let second = ingestor.run().await.unwrap();

    assert_eq!(first.ingested_names(), second.ingested_names());
    assert_eq!(catalog.table_names().len(), 2);
    assert_eq!(catalog.table("s3_catalog.landing.default.orders").unwrap().writes, 2);
}

#[tokio::test]
async fn test_corrupt_file_fails_only_its_table() {
    let source = memory_bucket(&[
        ("broken.json", b"{\"id\": "),
        ("orders.csv", ORDERS),
    ])
    .await;
    let catalog = Arc::new(InMemoryCatalog::new());

    let report = ingestor(IngestConfig::new(BUCKET), source, catalog.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.ingested_names(), ["s3_catalog.landing.default.orders"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, FailureScope::Table);
    assert_eq!(report.failures[0].name, "broken");
    assert!(report.failures[0].message.starts_with("Parse error"));
    assert!(!report.aborted());
}

#[tokio::test]
async fn test_unregistered_format_is_skipped() {
    let source = memory_bucket(&[("book.xlsx", b"PK\x03\x04")]).await;
    let catalog = Arc::new(InMemoryCatalog::new());
    let config = IngestConfig::new(BUCKET)
        .with_scan(ScanConfig::new().with_formats(["csv", "xlsx"]));

    let report = ingestor(config, source, catalog.clone()).run().await.unwrap();

    assert!(report.is_success());
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::UnsupportedFormat("xlsx".to_string())
    );
    assert!(catalog.table_names().is_empty());
}

#[tokio::test]
async fn test_empty_bucket_name_is_config_error() {
    let source = memory_bucket(&[]).await;
    let catalog = Arc::new(InMemoryCatalog::new());

    let result = ingestor(IngestConfig::new(""), source, catalog).run().await;
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_test_connection_counts_objects() {
    let source = memory_bucket(&[("a.csv", ORDERS), ("b/c.json", b"{}")]).await;
    let catalog = Arc::new(InMemoryCatalog::new());

    let count = ingestor(IngestConfig::new(BUCKET), source, catalog)
        .test_connection()
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[derive(Debug)]
struct UnreachableSource;

#[async_trait]
impl ObjectSource for UnreachableSource {
    async fn list_objects(&self, _bucket: &str) -> bucket_catalog::Result<Vec<String>> {
        Err(Error::Source("connection refused".to_string()))
    }

    async fn get_object_body(&self, _bucket: &str, _key: &str) -> bucket_catalog::Result<Option<Bytes>> {
        Err(Error::Source("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_listing_failure_aborts_pass() {
    let catalog = Arc::new(InMemoryCatalog::new());

    let report = ingestor(IngestConfig::new(BUCKET), Arc::new(UnreachableSource), catalog.clone())
        .run()
        .await
        .unwrap();

    assert!(report.aborted());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, FailureScope::Pass);
    assert_eq!(report.failures[0].name, BUCKET);
    assert!(report.failures[0].message.contains("connection refused"));
    assert!(catalog.table_names().is_empty());
}

/// Lists keys but never finds their bodies.
struct VanishingSource(Vec<String>);

#[async_trait]
impl ObjectSource for VanishingSource {
    async fn list_objects(&self, _bucket: &str) -> bucket_catalog::Result<Vec<String>> {
        Ok(self.0.clone())
    }

    async fn get_object_body(&self, _bucket: &str, _key: &str) -> bucket_catalog::Result<Option<Bytes>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_missing_body_is_skipped() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let source = Arc::new(VanishingSource(vec!["orders.csv".to_string()]));

    let report = ingestor(IngestConfig::new(BUCKET), source, catalog)
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::MissingBody("orders.csv".to_string())
    );
}

/// Counts schema requests and yields inside them so workers interleave.
struct CountingSink {
    inner: InMemoryCatalog,
    schema_calls: AtomicUsize,
}

#[async_trait]
impl CatalogSink for CountingSink {
    async fn get_or_create_service(&self, name: &str) -> bucket_catalog::Result<EntityRef> {
        self.inner.get_or_create_service(name).await
    }

    async fn get_or_create_database(
        &self,
        service: &EntityRef,
        name: &str,
    ) -> bucket_catalog::Result<EntityRef> {
        self.inner.get_or_create_database(service, name).await
    }

    async fn get_or_create_schema(
        &self,
        database: &EntityRef,
        name: &str,
    ) -> bucket_catalog::Result<EntityRef> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.inner.get_or_create_schema(database, name).await
    }

    async fn create_or_update_table(
        &self,
        request: &CreateTableRequest,
    ) -> bucket_catalog::Result<EntityRef> {
        self.inner.create_or_update_table(request).await
    }

    async fn ingest_sample_data(
        &self,
        table: &EntityRef,
        sample: &TableSample,
    ) -> bucket_catalog::Result<()> {
        self.inner.ingest_sample_data(table, sample).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_schema_created_once_across_workers() {
    let files: Vec<(String, &[u8])> = (0..12).map(|i| (format!("t{i:02}.csv"), ORDERS)).collect();
    let files: Vec<(&str, &[u8])> = files.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    let source = memory_bucket(&files).await;
    let sink = Arc::new(CountingSink {
        inner: InMemoryCatalog::new(),
        schema_calls: AtomicUsize::new(0),
    });

    let report = ingestor(
        IngestConfig::new(BUCKET).with_max_workers(8),
        source,
        sink.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.ingested.len(), 12);
    assert_eq!(sink.schema_calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.inner.schema_names(), ["s3_catalog.landing.default"]);
}

/// Rejects writes for one table name or one schema name.
#[derive(Default)]
struct RejectingSink {
    inner: InMemoryCatalog,
    reject_table: Option<&'static str>,
    reject_schema: Option<&'static str>,
}

#[async_trait]
impl CatalogSink for RejectingSink {
    async fn get_or_create_service(&self, name: &str) -> bucket_catalog::Result<EntityRef> {
        self.inner.get_or_create_service(name).await
    }

    async fn get_or_create_database(
        &self,
        service: &EntityRef,
        name: &str,
    ) -> bucket_catalog::Result<EntityRef> {
        self.inner.get_or_create_database(service, name).await
    }

    async fn get_or_create_schema(
        &self,
        database: &EntityRef,
        name: &str,
    ) -> bucket_catalog::Result<EntityRef> {
        if self.reject_schema == Some(name) {
            return Err(Error::Catalog(format!("schema '{name}' rejected")));
        }
        self.inner.get_or_create_schema(database, name).await
    }

    async fn create_or_update_table(
        &self,
        request: &CreateTableRequest,
    ) -> bucket_catalog::Result<EntityRef> {
        if self.reject_table == Some(request.name.as_str()) {
            return Err(Error::Catalog(format!("table '{}' rejected", request.name)));
        }
        self.inner.create_or_update_table(request).await
    }

    async fn ingest_sample_data(
        &self,
        table: &EntityRef,
        sample: &TableSample,
    ) -> bucket_catalog::Result<()> {
        self.inner.ingest_sample_data(table, sample).await
    }
}

#[tokio::test]
async fn test_table_write_failure_fails_only_that_table() {
    let source = memory_bucket(&[
        ("broken.csv", ORDERS),
        ("orders.csv", ORDERS),
        ("returns.csv", ORDERS),
    ])
    .await;
    let sink = Arc::new(RejectingSink {
        reject_table: Some("broken"),
        ..Default::default()
    });

    let report = ingestor(IngestConfig::new(BUCKET), source, sink.clone())
        .run()
        .await
        .unwrap();

    assert!(!report.aborted());
    assert_eq!(
        report.ingested_names(),
        [
            "s3_catalog.landing.default.orders",
            "s3_catalog.landing.default.returns"
        ]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, FailureScope::Table);
    assert_eq!(report.failures[0].name, "broken");
    assert!(report.failures[0].message.contains("table 'broken' rejected"));
    assert_eq!(sink.inner.table_names().len(), 2);
}

#[tokio::test]
async fn test_schema_failure_aborts_pass() {
    let source = memory_bucket(&[("orders.csv", ORDERS), ("users/a.csv", ORDERS)]).await;
    let sink = Arc::new(RejectingSink {
        reject_schema: Some("users"),
        ..Default::default()
    });

    let report = ingestor(
        IngestConfig::new(BUCKET).with_max_workers(1),
        source,
        sink.clone(),
    )
    .run()
    .await
    .unwrap();

    assert!(report.aborted());
    let pass_failures: Vec<_> = report
        .failures
        .iter()
        .filter(|f| f.scope == FailureScope::Pass)
        .collect();
    assert_eq!(pass_failures.len(), 1);
    assert_eq!(pass_failures[0].name, BUCKET);
    assert!(pass_failures[0].message.contains("schema 'users' rejected"));
    assert_eq!(sink.inner.schema_names(), ["s3_catalog.landing.default"]);
    assert!(!sink
        .inner
        .table_names()
        .iter()
        .any(|name| name.contains("users")));
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl IngestObserver for RecordingObserver {
    fn on_listing(&self, bucket: &str, object_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("listed {bucket} {object_count}"));
    }

    fn on_table_ingested(&self, table: &str, _fqn: &str) {
        self.events.lock().unwrap().push(format!("ingested {table}"));
    }

    fn on_table_skipped(&self, table: &str, _reason: &SkipReason) {
        self.events.lock().unwrap().push(format!("skipped {table}"));
    }

    fn on_table_failed(&self, table: &str, _message: &str) {
        self.events.lock().unwrap().push(format!("failed {table}"));
    }
}

#[tokio::test]
async fn test_observer_receives_events() {
    let source = memory_bucket(&[
        ("orders.csv", ORDERS),
        ("empty.csv", b""),
        ("bad.json", b"[1]"),
    ])
    .await;
    let observer = Arc::new(RecordingObserver::default());

    ingestor(
        IngestConfig::new(BUCKET),
        source,
        Arc::new(InMemoryCatalog::new()),
    )
    .with_observer(observer.clone())
    .run()
    .await
    .unwrap();

    let mut events = observer.events.lock().unwrap().clone();
    events.sort();
    assert_eq!(
        events,
        ["failed bad", "ingested orders", "listed landing 3", "skipped empty"]
    );
}

#[cfg(feature = "parquet")]
#[tokio::test]
async fn test_partitioned_parquet_dataset() {
    use datafusion::arrow::array::{Int64Array, StringArray};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use datafusion::arrow::record_batch::RecordBatch;
    use datafusion::parquet::arrow::ArrowWriter;

    let schema = Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Int64, false),
        Field::new("action", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![7, 8])),
            Arc::new(StringArray::from(vec![Some("login"), None])),
        ],
    )
    .unwrap();
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let source = memory_bucket(&[
        ("events/year=2024/month=01/part-0.parquet", &buffer),
        ("events/year=2024/month=02/part-0.parquet", &buffer),
    ])
    .await;
    let catalog = Arc::new(InMemoryCatalog::new());

    let report = ingestor(IngestConfig::new(BUCKET), source, catalog.clone())
        .run()
        .await
        .unwrap();
    assert!(report.is_success(), "{:?}", report.failures);

    let events = catalog.table("s3_catalog.landing.events.events").unwrap();
    let columns: Vec<(&str, &str)> = events
        .request
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str()))
        .collect();
    assert_eq!(
        columns,
        [
            ("user_id", "INT"),
            ("action", "STRING"),
            ("month", "STRING"),
            ("year", "STRING"),
        ]
    );
    assert_eq!(
        events.sample.unwrap().rows,
        vec![vec!["7", "login"], vec!["8", ""]]
    );
}
