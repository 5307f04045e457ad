//! Catalog sink abstraction
//!
//! The ingestion pass writes services, databases, schemas, tables and sample
//! rows through the `CatalogSink` trait. Every operation is a get-or-create or
//! create-or-update keyed by fully qualified name, so re-running a pass updates
//! entities instead of duplicating them.

use crate::error::{Error, Result};
use crate::schema::{Column, TableSample};
use async_trait::async_trait;
use bucket_layout::TableTag;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Identity of an entity stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    pub fully_qualified_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableType {
    #[default]
    Regular,
}

impl TableType {
    pub fn as_str(self) -> &'static str {
        match self {
            TableType::Regular => "Regular",
        }
    }
}

/// Everything needed to create or update one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableRequest {
    pub name: String,
    /// Fully qualified name of the parent schema
    pub database_schema: String,
    pub columns: Vec<Column>,
    pub tags: Vec<TableTag>,
    pub description: String,
    pub file_format: String,
    pub table_type: TableType,
}

/// Destination for catalog entities
#[async_trait]
pub trait CatalogSink: Send + Sync {
    async fn get_or_create_service(&self, name: &str) -> Result<EntityRef>;

    async fn get_or_create_database(&self, service: &EntityRef, name: &str) -> Result<EntityRef>;

    async fn get_or_create_schema(&self, database: &EntityRef, name: &str) -> Result<EntityRef>;

    /// Create the table, or update it in place when its fully qualified name exists
    async fn create_or_update_table(&self, request: &CreateTableRequest) -> Result<EntityRef>;

    /// Replace the sample rows stored for a table
    async fn ingest_sample_data(&self, table: &EntityRef, sample: &TableSample) -> Result<()>;
}

/// Join a parent fully qualified name and a child name.
pub fn child_fqn(parent: &str, name: &str) -> String {
    format!("{}.{}", parent, name)
}

/// A table as held by [`InMemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTable {
    pub entity: EntityRef,
    pub request: CreateTableRequest,
    pub sample: Option<TableSample>,
    /// Number of create-or-update calls received for this table
    pub writes: usize,
}

#[derive(Debug, Default)]
struct CatalogState {
    next_id: u64,
    services: BTreeMap<String, EntityRef>,
    databases: BTreeMap<String, EntityRef>,
    schemas: BTreeMap<String, EntityRef>,
    schema_creations: BTreeMap<String, usize>,
    tables: BTreeMap<String, StoredTable>,
}

impl CatalogState {
    fn entity(&mut self, kind: &str, name: &str, fqn: String) -> EntityRef {
        self.next_id += 1;
        EntityRef {
            id: format!("{}-{}", kind, self.next_id),
            name: name.to_string(),
            fully_qualified_name: fqn,
        }
    }
}

/// Catalog kept in process memory, for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CatalogState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("in-memory catalog lock poisoned".to_string()))
    }

    pub fn table(&self, fqn: &str) -> Option<StoredTable> {
        self.lock().ok()?.tables.get(fqn).cloned()
    }

    /// Fully qualified names of all tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.lock()
            .map(|state| state.tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn schema_names(&self) -> Vec<String> {
        self.lock()
            .map(|state| state.schemas.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// How many times a schema was actually created (not just looked up).
    pub fn schema_creations(&self, fqn: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|state| state.schema_creations.get(fqn).copied())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CatalogSink for InMemoryCatalog {
    async fn get_or_create_service(&self, name: &str) -> Result<EntityRef> {
        let mut state = self.lock()?;
        if let Some(existing) = state.services.get(name) {
            return Ok(existing.clone());
        }
        let entity = state.entity("service", name, name.to_string());
        state.services.insert(name.to_string(), entity.clone());
        Ok(entity)
    }

    async fn get_or_create_database(&self, service: &EntityRef, name: &str) -> Result<EntityRef> {
        let fqn = child_fqn(&service.fully_qualified_name, name);
        let mut state = self.lock()?;
        if let Some(existing) = state.databases.get(&fqn) {
            return Ok(existing.clone());
        }
        let entity = state.entity("database", name, fqn.clone());
        state.databases.insert(fqn, entity.clone());
        Ok(entity)
    }

    async fn get_or_create_schema(&self, database: &EntityRef, name: &str) -> Result<EntityRef> {
        let fqn = child_fqn(&database.fully_qualified_name, name);
        let mut state = self.lock()?;
        if let Some(existing) = state.schemas.get(&fqn) {
            return Ok(existing.clone());
        }
        let entity = state.entity("schema", name, fqn.clone());
        *state.schema_creations.entry(fqn.clone()).or_insert(0) += 1;
        state.schemas.insert(fqn, entity.clone());
        Ok(entity)
    }

    async fn create_or_update_table(&self, request: &CreateTableRequest) -> Result<EntityRef> {
        let mut state = self.lock()?;
        if !state.schemas.contains_key(&request.database_schema) {
            return Err(Error::Catalog(format!(
                "Schema '{}' does not exist",
                request.database_schema
            )));
        }

        let fqn = child_fqn(&request.database_schema, &request.name);
        if let Some(stored) = state.tables.get_mut(&fqn) {
            stored.request = request.clone();
            stored.writes += 1;
            return Ok(stored.entity.clone());
        }

        let entity = state.entity("table", &request.name, fqn.clone());
        state.tables.insert(
            fqn,
            StoredTable {
                entity: entity.clone(),
                request: request.clone(),
                sample: None,
                writes: 1,
            },
        );
        Ok(entity)
    }

    async fn ingest_sample_data(&self, table: &EntityRef, sample: &TableSample) -> Result<()> {
        let mut state = self.lock()?;
        let stored = state
            .tables
            .get_mut(&table.fully_qualified_name)
            .filter(|stored| stored.entity.id == table.id)
            .ok_or_else(|| {
                Error::Catalog(format!("Table '{}' does not exist", table.fully_qualified_name))
            })?;
        stored.sample = Some(sample.clone());
        Ok(())
    }
}
