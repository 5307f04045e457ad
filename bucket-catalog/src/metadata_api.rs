//! OpenMetadata-compatible REST API client
//!
//! This module provides a `CatalogSink` that writes services, databases,
//! schemas, tables and sample data to a metadata server over HTTP.
//!
//! Lookups use `GET /api/v1/{collection}/name/{fqn}`; creation uses
//! `PUT /api/v1/{collection}`, which the server treats as create-or-update.

use crate::error::{Error, Result};
use crate::schema::{Column, TableSample};
use crate::sink::{child_fqn, CatalogSink, CreateTableRequest, EntityRef};
use async_trait::async_trait;
use bucket_layout::TableTag;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICES: &str = "services/databaseServices";
const DATABASES: &str = "databases";
const SCHEMAS: &str = "databaseSchemas";
const TABLES: &str = "tables";

/// Service type registered for bucket catalogs
const SERVICE_TYPE: &str = "CustomDatabase";

/// HTTP client for an OpenMetadata-compatible server
///
/// # Example
/// ```no_run
/// use bucket_catalog::metadata_api::MetadataApiClient;
/// use bucket_catalog::sink::CatalogSink;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = MetadataApiClient::new("http://localhost:8585").with_token("jwt");
/// let service = client.get_or_create_service("s3_catalog").await?;
/// println!("service id: {}", service.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MetadataApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

/// Entity fields common to every create/lookup response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityResponse {
    pub id: String,
    pub name: String,
    pub fully_qualified_name: String,
}

impl From<EntityResponse> for EntityRef {
    fn from(entity: EntityResponse) -> Self {
        EntityRef {
            id: entity.id,
            name: entity.name,
            fully_qualified_name: entity.fully_qualified_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateService<'a> {
    name: &'a str,
    service_type: &'a str,
    connection: ServiceConnection<'a>,
}

#[derive(Debug, Serialize)]
struct ServiceConnection<'a> {
    config: ServiceConfig<'a>,
}

#[derive(Debug, Serialize)]
struct ServiceConfig<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateDatabase<'a> {
    name: &'a str,
    service: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateSchema<'a> {
    name: &'a str,
    database: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTable<'a> {
    name: &'a str,
    database_schema: &'a str,
    columns: &'a [Column],
    tags: Vec<TagLabel<'a>>,
    description: &'a str,
    file_format: &'a str,
    table_type: &'a str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct TagLabel<'a> {
    #[serde(rename = "tagFQN")]
    tag_fqn: &'a str,
    source: &'static str,
    label_type: &'static str,
    state: &'static str,
}

impl<'a> From<&'a TableTag> for TagLabel<'a> {
    fn from(tag: &'a TableTag) -> Self {
        TagLabel {
            tag_fqn: &tag.id,
            source: "Classification",
            label_type: if tag.source.is_automated() {
                "Automated"
            } else {
                "Manual"
            },
            state: "Confirmed",
        }
    }
}

impl MetadataApiClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Server root (e.g., "http://localhost:8585"), without `/api`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client: reqwest::Client::new(),
        }
    }

    /// Authenticate every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// `{base_url}/api/v1/` followed by `segments`, each percent-encoded.
    fn url<'a, I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::Config(format!("invalid metadata API URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!(
                    "metadata API URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn error_for(response: Response) -> Error {
        Error::HttpClient(format!(
            "Metadata API returned status {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        ))
    }

    /// Look up an entity by fully qualified name
    ///
    /// # Returns
    /// `None` when the server answers 404
    pub async fn get_by_name(&self, collection: &str, fqn: &str) -> Result<Option<EntityRef>> {
        let url = self.url(collection.split('/').chain(["name", fqn]))?;
        let response = self.authorize(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let entity: EntityResponse = response.json().await?;
        Ok(Some(entity.into()))
    }

    async fn put<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<Response> {
        debug!(url = %url, "PUT");
        let response = self.authorize(self.client.put(url)).json(body).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(response)
    }

    async fn put_entity<B: Serialize + ?Sized>(&self, collection: &str, body: &B) -> Result<EntityRef> {
        let url = self.url(collection.split('/'))?;
        let entity: EntityResponse = self.put(url, body).await?.json().await?;
        Ok(entity.into())
    }

    async fn get_or_put<B: Serialize + ?Sized>(
        &self,
        collection: &str,
        fqn: &str,
        body: &B,
    ) -> Result<EntityRef> {
        if let Some(existing) = self.get_by_name(collection, fqn).await? {
            return Ok(existing);
        }
        self.put_entity(collection, body).await
    }
}

#[async_trait]
impl CatalogSink for MetadataApiClient {
    async fn get_or_create_service(&self, name: &str) -> Result<EntityRef> {
        let body = CreateService {
            name,
            service_type: SERVICE_TYPE,
            connection: ServiceConnection {
                config: ServiceConfig { kind: SERVICE_TYPE },
            },
        };
        self.get_or_put(SERVICES, name, &body).await
    }

    async fn get_or_create_database(&self, service: &EntityRef, name: &str) -> Result<EntityRef> {
        let body = CreateDatabase {
            name,
            service: &service.fully_qualified_name,
        };
        let fqn = child_fqn(&service.fully_qualified_name, name);
        self.get_or_put(DATABASES, &fqn, &body).await
    }

    async fn get_or_create_schema(&self, database: &EntityRef, name: &str) -> Result<EntityRef> {
        let body = CreateSchema {
            name,
            database: &database.fully_qualified_name,
        };
        let fqn = child_fqn(&database.fully_qualified_name, name);
        self.get_or_put(SCHEMAS, &fqn, &body).await
    }

    async fn create_or_update_table(&self, request: &CreateTableRequest) -> Result<EntityRef> {
        let body = CreateTable {
            name: &request.name,
            database_schema: &request.database_schema,
            columns: &request.columns,
            tags: request.tags.iter().map(TagLabel::from).collect(),
            description: &request.description,
            file_format: &request.file_format,
            table_type: request.table_type.as_str(),
        };
        self.put_entity(TABLES, &body).await
    }

    async fn ingest_sample_data(&self, table: &EntityRef, sample: &TableSample) -> Result<()> {
        let url = self.url([TABLES, table.id.as_str(), "sampleData"])?;
        self.put(url, sample).await?;
        Ok(())
    }
}
