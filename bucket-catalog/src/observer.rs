//! Progress callbacks for an ingestion pass.

use bucket_layout::TableGroup;
use tracing::{error, info, warn};

use crate::ingest::SkipReason;

/// Receives per-table progress from the ingestion pass.
///
/// All methods default to doing nothing, so implementations only override
/// the events they care about. Callbacks may arrive from several workers at
/// once.
pub trait IngestObserver: Send + Sync {
    fn on_listing(&self, _bucket: &str, _object_count: usize) {}

    fn on_table_grouped(&self, _group: &TableGroup) {}

    fn on_table_ingested(&self, _table: &str, _fully_qualified_name: &str) {}

    fn on_table_skipped(&self, _table: &str, _reason: &SkipReason) {}

    fn on_table_failed(&self, _table: &str, _message: &str) {}
}

/// Observer that reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl IngestObserver for TracingObserver {
    fn on_listing(&self, bucket: &str, object_count: usize) {
        info!(bucket = bucket, objects = object_count, "Listed bucket");
    }

    fn on_table_grouped(&self, group: &TableGroup) {
        info!(
            table = %group.name,
            files = group.files.len(),
            structure = %group.folder_structure,
            "Processing table group"
        );
    }

    fn on_table_ingested(&self, table: &str, fully_qualified_name: &str) {
        info!(table = table, fqn = fully_qualified_name, "Ingested table");
    }

    fn on_table_skipped(&self, table: &str, reason: &SkipReason) {
        warn!(table = table, reason = %reason, "Skipped table");
    }

    fn on_table_failed(&self, table: &str, message: &str) {
        error!(table = table, error = message, "Failed to ingest table");
    }
}
