//! HTTP clients for the recipe embedding, vector search and metadata services

use crate::collaborators::{parse_ingredient_list, Embedder, MetadataStore, VectorIndex};
use crate::error::{PlannerError, Result};
use crate::types::{RecipeId, VectorHit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PlannerError::Config(format!("cannot build HTTP client: {}", e)))
}

/// Turn a non-2xx response into an `ExternalService` error.
async fn check_status(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(PlannerError::external(service, format!("HTTP {}: {}", status, body)))
}

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    vector: Vec<f32>,
}

/// Sentence-embedding service client
pub struct HttpEmbedder {
    service_url: String,
    dimension: usize,
    client: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(service_url: String, dimension: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            dimension,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &'static str {
        "http_embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/encode", self.service_url);
        debug!("Encoding {} chars via {}", text.len(), url);

        let response = self.client.post(&url).json(&EncodeRequest { text }).send().await?;
        let response = check_status("embedding service", response).await?;
        let encoded: EncodeResponse = response.json().await.map_err(|e| {
            PlannerError::external("embedding service", format!("unreadable response: {}", e))
        })?;

        if encoded.vector.len() != self.dimension {
            return Err(PlannerError::external(
                "embedding service",
                format!(
                    "expected {}-dimensional vector, got {}",
                    self.dimension,
                    encoded.vector.len()
                ),
            ));
        }
        Ok(encoded.vector)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: HitId,
    similarity: f32,
}

/// Index services key recipes by string id or by integer row number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitId {
    Text(String),
    Row(u64),
}

impl From<HitId> for RecipeId {
    fn from(id: HitId) -> Self {
        match id {
            HitId::Text(s) => RecipeId::new(s),
            HitId::Row(n) => RecipeId::new(n.to_string()),
        }
    }
}

/// Vector search service client
pub struct HttpVectorIndex {
    service_url: String,
    client: reqwest::Client,
}

impl HttpVectorIndex {
    pub fn new(service_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    fn name(&self) -> &'static str {
        "http_vector_index"
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        let url = format!("{}/search", self.service_url);
        let response = self
            .client
            .post(&url)
            .json(&SearchRequest { vector, k })
            .send()
            .await?;
        let response = check_status("vector service", response).await?;
        let found: SearchResponse = response.json().await.map_err(|e| {
            PlannerError::external("vector service", format!("unreadable response: {}", e))
        })?;

        debug!("Vector search returned {} hits (k={})", found.hits.len(), k);

        Ok(found
            .hits
            .into_iter()
            .map(|h| VectorHit {
                id: h.id.into(),
                similarity: h.similarity,
            })
            .collect())
    }
}

/// Stored ingredients arrive either as a JSON array or as the raw dataset
/// string (`"['butter', 'sugar']"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredIngredients {
    List(Vec<String>),
    Raw(String),
}

#[derive(Debug, Deserialize)]
struct RecipeRecord {
    title: String,
    ingredients: serde_json::Value,
}

/// Recipe metadata service client
pub struct HttpMetadataStore {
    service_url: String,
    client: reqwest::Client,
}

impl HttpMetadataStore {
    pub fn new(service_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    async fn fetch(&self, id: &RecipeId) -> Result<RecipeRecord> {
        let url = format!("{}/recipes/{}", self.service_url, urlencoding::encode(id.as_str()));
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PlannerError::malformed(id.as_str(), "record missing from metadata store"));
        }
        let response = check_status("metadata service", response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| PlannerError::malformed(id.as_str(), format!("unreadable record: {}", e)))
    }
}

#[async_trait]
impl MetadataStore for HttpMetadataStore {
    fn name(&self) -> &'static str {
        "http_metadata"
    }

    async fn get_ingredients(&self, id: &RecipeId) -> Result<Vec<String>> {
        let record = self.fetch(id).await?;
        match serde_json::from_value::<StoredIngredients>(record.ingredients) {
            Ok(StoredIngredients::List(items)) => Ok(items),
            Ok(StoredIngredients::Raw(raw)) => parse_ingredient_list(id.as_str(), &raw),
            Err(_) => Err(PlannerError::malformed(id.as_str(), "ingredients are neither a list nor a string")),
        }
    }

    async fn get_title(&self, id: &RecipeId) -> Result<String> {
        Ok(self.fetch(id).await?.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_encode_checks_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/encode"))
            .and(body_json(json!({ "text": "butter sugar" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "vector": [0.6, 0.8] })))
            .mount(&server)
            .await;

        let ok = HttpEmbedder::new(server.uri(), 2, TIMEOUT).unwrap();
        assert_eq!(ok.encode("butter sugar").await.unwrap(), vec![0.6, 0.8]);

        let wrong_dim = HttpEmbedder::new(server.uri(), 384, TIMEOUT).unwrap();
        let err = wrong_dim.encode("butter sugar").await.unwrap_err();
        assert!(matches!(err, PlannerError::ExternalService { .. }));
    }

    #[tokio::test]
    async fn test_search_decodes_hits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [
                    { "id": "r-17", "similarity": 0.92 },
                    { "id": "r-3", "similarity": 0.81 }
                ]
            })))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), TIMEOUT).unwrap();
        let hits = index.search(&[0.6, 0.8], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, RecipeId::new("r-17"));
    }

    #[tokio::test]
    async fn test_search_accepts_integer_row_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [
                    { "id": 17, "similarity": 0.9 },
                    { "id": "r-3", "similarity": 0.8 }
                ]
            })))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), TIMEOUT).unwrap();
        let hits = index.search(&[0.6, 0.8], 5).await.unwrap();
        assert_eq!(hits[0].id, RecipeId::new("17"));
        assert_eq!(hits[1].id, RecipeId::new("r-3"));
    }

    #[tokio::test]
    async fn test_slow_embedding_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/encode"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "vector": [0.6, 0.8] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), 2, Duration::from_millis(50)).unwrap();
        let err = embedder.encode("butter").await.unwrap_err();
        assert!(matches!(err, PlannerError::ExternalService { .. }));
        assert!(err.to_string().contains("timed out"), "got {}", err);
    }

    #[tokio::test]
    async fn test_search_outage_is_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), TIMEOUT).unwrap();
        let err = index.search(&[1.0], 5).await.unwrap_err();
        assert!(matches!(err, PlannerError::ExternalService { .. }));
    }

    #[tokio::test]
    async fn test_metadata_accepts_list_and_raw_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Shortbread",
                "ingredients": ["butter", "sugar", "flour"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/recipes/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Fudge",
                "ingredients": "['butter', 'sugar', 'cocoa']"
            })))
            .mount(&server)
            .await;

        let store = HttpMetadataStore::new(server.uri(), TIMEOUT).unwrap();
        assert_eq!(
            store.get_ingredients(&RecipeId::new("1")).await.unwrap(),
            vec!["butter", "sugar", "flour"]
        );
        assert_eq!(
            store.get_ingredients(&RecipeId::new("2")).await.unwrap(),
            vec!["butter", "sugar", "cocoa"]
        );
        assert_eq!(store.get_title(&RecipeId::new("2")).await.unwrap(), "Fudge");
    }

    #[tokio::test]
    async fn test_metadata_bad_records_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Broken",
                "ingredients": "butter, sugar"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/recipes/8"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpMetadataStore::new(server.uri(), TIMEOUT).unwrap();
        assert!(store.get_ingredients(&RecipeId::new("7")).await.unwrap_err().is_malformed());
        assert!(store.get_ingredients(&RecipeId::new("8")).await.unwrap_err().is_malformed());
    }
}
