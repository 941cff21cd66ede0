//! Elasticsearch index client
//!
//! All operations go through the REST API with a shared `reqwest` client.
//! Index resets are idempotent: deleting a missing index and creating an
//! existing one are both swallowed, so a recreate race cannot fail a job.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Result, SearchError};
use crate::config::ElasticConfig;
use crate::ingest::NewSku;

/// Denormalized text projection of a SKU, one document per record.
#[derive(Debug, Clone, Serialize)]
pub struct SkuDocument {
    pub uuid: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub barcode: Option<i64>,
    pub category_id: Option<i32>,
    pub price: Option<f64>,
    pub params: Value,
}

impl SkuDocument {
    /// Project a SKU record into its search document.
    pub fn project(sku: &NewSku) -> Self {
        Self {
            uuid: sku.uuid,
            name: sku.title.clone(),
            description: sku.description.clone(),
            vendor: sku.brand.clone(),
            barcode: sku.barcode,
            category_id: sku.category_id,
            price: sku.price_after_discounts,
            params: sku.features.clone(),
        }
    }
}

/// Seed text for a more-like-this query.
#[derive(Debug, Clone, Default)]
pub struct SimilarSeed {
    pub name: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
}

/// Client for one named search index.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    client: Client,
    base_url: String,
    index: String,
    username: String,
    password: String,
    analyzer: String,
}

impl SearchIndex {
    /// Create a client from configuration.
    pub fn new(config: &ElasticConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("catfeed-server/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            index: config.index.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            analyzer: config.analyzer.clone(),
        })
    }

    /// Name of the index this client targets.
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Delete the index. A missing index is not an error.
    pub async fn delete_index(&self) -> Result<()> {
        let url = format!("{}/{}", self.base_url, self.index);
        let response = self.authed(self.client.delete(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(index = %self.index, "Index already absent, nothing to delete");
            return Ok(());
        }
        self.check(response).await?;

        info!(index = %self.index, "Deleted search index");
        Ok(())
    }

    /// Create the index with its text mapping. An existing index is not an
    /// error (create-if-absent).
    pub async fn ensure_index(&self) -> Result<()> {
        let url = format!("{}/{}", self.base_url, self.index);
        let body = json!({
            "mappings": {
                "properties": {
                    "name": { "type": "text", "analyzer": self.analyzer },
                    "description": { "type": "text", "analyzer": self.analyzer },
                }
            }
        });

        let response = self.authed(self.client.put(&url)).json(&body).send().await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().await?;
            if text.contains("resource_already_exists_exception") {
                debug!(index = %self.index, "Index already exists");
                return Ok(());
            }
            return Err(SearchError::Rejected {
                status: StatusCode::BAD_REQUEST.as_u16(),
                body: text,
            });
        }
        self.check(response).await?;

        info!(index = %self.index, "Created search index");
        Ok(())
    }

    /// Delete and recreate the index.
    pub async fn reset(&self) -> Result<()> {
        self.delete_index().await?;
        self.ensure_index().await
    }

    /// Upsert one document by id.
    pub async fn index_document(&self, doc: &SkuDocument) -> Result<()> {
        let url = format!("{}/{}/_doc/{}", self.base_url, self.index, doc.uuid);
        let response = self.authed(self.client.put(&url)).json(doc).send().await?;
        self.check(response).await?;
        Ok(())
    }

    /// Force visibility of prior writes for subsequent queries.
    pub async fn refresh(&self) -> Result<()> {
        let url = format!("{}/{}/_refresh", self.base_url, self.index);
        let response = self.authed(self.client.post(&url)).send().await?;
        self.check(response).await?;
        Ok(())
    }

    /// Find documents most similar to the seed text, ranked by relevance.
    ///
    /// The seed record's own id is excluded from the result; at most `size`
    /// ids are returned.
    pub async fn find_similar(
        &self,
        seed: &SimilarSeed,
        exclude: Uuid,
        size: usize,
    ) -> Result<Vec<Uuid>> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let body = json!({
            "size": size,
            "query": {
                "more_like_this": {
                    "fields": ["name", "description", "vendor"],
                    "like": [{
                        "doc": {
                            "name": seed.name,
                            "description": seed.description,
                            "vendor": seed.vendor,
                        }
                    }],
                    "min_term_freq": 1,
                    "max_query_terms": 12,
                }
            }
        });

        let response = self.authed(self.client.post(&url)).json(&body).send().await?;
        let response = self.check(response).await?;
        let payload: Value = response.json().await?;

        let hits = payload["hits"]["hits"]
            .as_array()
            .ok_or_else(|| SearchError::InvalidResponse("missing hits array".to_string()))?;

        let mut ids = Vec::new();
        for hit in hits {
            let raw = hit["_id"]
                .as_str()
                .ok_or_else(|| SearchError::InvalidResponse("hit without _id".to_string()))?;
            let id = Uuid::parse_str(raw)
                .map_err(|_| SearchError::InvalidResponse(format!("non-uuid hit id '{raw}'")))?;
            if id != exclude {
                ids.push(id);
            }
        }
        ids.truncate(size);

        Ok(ids)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        if self.password.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
