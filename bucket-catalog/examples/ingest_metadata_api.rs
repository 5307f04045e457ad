//! Example: publish a local directory to an OpenMetadata-compatible server
//!
//! ## Usage
//!
//! ```bash
//! METADATA_API_URL=http://localhost:8585 \
//! METADATA_API_TOKEN=<jwt> \
//! BUCKET_ROOT=/data/landing \
//! BUCKET_NAME=landing \
//! RUST_LOG=info \
//! cargo run --features metadata-api --example ingest_metadata_api
//! ```

use bucket_catalog::{IngestConfig, IngestReport, Ingestor, MetadataApiClient, ObjectStoreSource};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn print_report(report: &IngestReport) {
    for fqn in report.ingested_names() {
        println!("ingested {}", fqn);
    }
    for skipped in &report.skipped {
        println!("skipped  {}: {}", skipped.name, skipped.reason);
    }
    for failure in &report.failures {
        println!("failed   {}: {}", failure.name, failure.message);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let api_url = env::var("METADATA_API_URL").unwrap_or_else(|_| "http://localhost:8585".to_string());
    let root = env::var("BUCKET_ROOT").unwrap_or_else(|_| ".".to_string());
    let bucket = env::var("BUCKET_NAME").unwrap_or_else(|_| "local".to_string());
    let service = env::var("SERVICE_NAME").unwrap_or_else(|_| "s3_catalog".to_string());

    println!("Metadata API: {}", api_url);
    println!("Bucket: {} (root {})", bucket, root);
    println!();

    let mut client = MetadataApiClient::new(&api_url);
    if let Ok(token) = env::var("METADATA_API_TOKEN") {
        client = client.with_token(token);
    }

    let source = ObjectStoreSource::local(&bucket, &root)?;
    let config = IngestConfig::new(bucket).with_service_name(service);
    let report = Ingestor::new(config, Arc::new(source), Arc::new(client))
        .run()
        .await?;

    print_report(&report);

    if !report.is_success() {
        return Err(format!("{} table(s) failed", report.failures.len()).into());
    }
    Ok(())
}
