//! Example: dry-run catalog ingestion of a local directory
//!
//! Treats a local directory as a bucket, groups its files into logical tables
//! and writes them to an in-memory catalog, then prints what would have been
//! published.
//!
//! ## Usage
//!
//! ```bash
//! BUCKET_ROOT=/data/landing \
//! bucketName=landing \
//! tag_mapping="pii:PII.Sensitive" \
//! RUST_LOG=info \
//! cargo run --example ingest_local
//! ```
//!
//! Any option recognised by `IngestConfig::from_options` can be set as an
//! environment variable of the same name.

use bucket_catalog::config::options as ingest_options;
use bucket_catalog::{IngestConfig, Ingestor, InMemoryCatalog, ObjectStoreSource};
use bucket_layout::config::options as scan_options;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const OPTION_NAMES: &[&str] = &[
    ingest_options::BUCKET_NAME,
    ingest_options::SERVICE_NAME,
    ingest_options::MAX_WORKERS,
    scan_options::FILE_FORMATS,
    scan_options::ENABLE_PARTITION_PARSING,
    scan_options::SAMPLE_SIZE,
    scan_options::TAG_MAPPING,
    scan_options::DEFAULT_TAGS,
    scan_options::INCLUDE_PATH_PATTERN,
    scan_options::EXCLUDE_PATH_PATTERN,
    scan_options::ENABLE_HIERARCHICAL_FOLDERS,
    scan_options::FOLDER_DEPTH_FOR_TABLES,
    scan_options::INCLUDE_SUBFOLDER_INFO,
];

fn options_from_env() -> HashMap<String, String> {
    let mut opts: HashMap<String, String> = OPTION_NAMES
        .iter()
        .filter_map(|name| env::var(name).ok().map(|value| (name.to_string(), value)))
        .collect();
    opts.entry(ingest_options::BUCKET_NAME.to_string())
        .or_insert_with(|| "local".to_string());
    opts
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let root = env::var("BUCKET_ROOT").unwrap_or_else(|_| ".".to_string());
    let config = IngestConfig::from_options(&options_from_env())?;

    println!("Bucket: {} (root {})", config.bucket_name(), root);
    println!();

    let source = ObjectStoreSource::local(config.bucket_name(), &root)?;
    let catalog = Arc::new(InMemoryCatalog::new());
    let ingestor = Ingestor::new(config, Arc::new(source), catalog.clone());

    let objects = ingestor.test_connection().await?;
    println!("Found {} objects", objects);

    let report = ingestor.run().await?;

    println!(
        "Grouped {} of {} keys ({} unsupported, {} filtered)",
        report.summary.grouped,
        report.summary.keys_seen,
        report.summary.unsupported_format,
        report.summary.filtered_out
    );
    println!();

    for fqn in catalog.table_names() {
        let Some(table) = catalog.table(&fqn) else {
            continue;
        };
        println!("{}", fqn);
        for column in &table.request.columns {
            println!("  {:<24} {}", column.name, column.data_type);
        }
        let tags: Vec<&str> = table.request.tags.iter().map(|t| t.id.as_str()).collect();
        println!("  tags: {}", tags.join(", "));
        if let Some(sample) = &table.sample {
            println!("  sample rows: {}", sample.rows.len());
        }
        println!();
    }

    for skipped in &report.skipped {
        println!("skipped {}: {}", skipped.name, skipped.reason);
    }
    for failure in &report.failures {
        println!("failed {} ({:?}): {}", failure.name, failure.scope, failure.message);
    }

    Ok(())
}
