//! Graph store backed by the Neo4j HTTP transactional endpoint

use crate::collaborators::GraphStore;
use crate::config::Neo4jSettings;
use crate::error::{PlannerError, Result};
use crate::types::{CooccurrenceCount, DirectEdge};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "neo4j";

const DIRECT_EDGES_IN_CONTEXT: &str = "\
MATCH (a:Ingredient {name: $ingredient})-[r:SUBSTITUTES_WITH]->(b:Ingredient)
WHERE r.context = $context
RETURN b.name AS substitute, r.score AS score, r.context AS context
ORDER BY score DESC, substitute ASC
LIMIT $limit";

const DIRECT_EDGES_ANY_CONTEXT: &str = "\
MATCH (a:Ingredient {name: $ingredient})-[r:SUBSTITUTES_WITH]->(b:Ingredient)
RETURN b.name AS substitute, r.score AS score, r.context AS context
ORDER BY score DESC, substitute ASC
LIMIT $limit";

const COOCCURRENCE: &str = "\
MATCH (i:Ingredient {name: $ingredient})<-[:HAS_INGREDIENT]-(r:Recipe)-[:HAS_INGREDIENT]->(sub:Ingredient)
WHERE sub.name <> $ingredient
RETURN sub.name AS substitute, count(DISTINCT r) AS together
ORDER BY together DESC, substitute ASC
LIMIT $limit";

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// HTTP client for Neo4j
#[derive(Debug, Clone)]
pub struct Neo4jGraph {
    endpoint: String,
    user: String,
    password: Option<String>,
    max_rows: usize,
    client: reqwest::Client,
}

impl Neo4jGraph {
    pub fn new(settings: &Neo4jSettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlannerError::Config(format!("cannot build Neo4j client: {}", e)))?;
        Ok(Self {
            endpoint: format!(
                "{}/db/{}/tx/commit",
                settings.url.trim_end_matches('/'),
                settings.database
            ),
            user: settings.user.clone(),
            password: settings.password.clone(),
            max_rows: settings.max_rows.max(1),
            client,
        })
    }

    /// Run one read statement and return its rows.
    async fn query(&self, statement: &str, parameters: Value) -> Result<Vec<Vec<Value>>> {
        let body = TxRequest {
            statements: vec![Statement {
                statement,
                parameters,
            }],
        };

        debug!("Running Cypher against {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, self.password.as_ref())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::external(SERVICE, format!("HTTP {}: {}", status, body)));
        }

        let tx: TxResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::external(SERVICE, format!("unreadable response: {}", e)))?;

        if let Some(err) = tx.errors.first() {
            return Err(PlannerError::external(SERVICE, format!("{}: {}", err.code, err.message)));
        }

        Ok(tx
            .results
            .into_iter()
            .flat_map(|r| r.data.into_iter().map(|d| d.row))
            .collect())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<bool> {
        self.query("RETURN 1", json!({})).await.map(|_| true)
    }
}

fn decode_direct(row: &[Value]) -> Option<DirectEdge> {
    let target = row.first()?.as_str()?.to_string();
    let score = row.get(1)?.as_f64()? as f32;
    let context = row.get(2).and_then(|v| v.as_str()).map(|s| s.to_string());
    Some(DirectEdge {
        target,
        score,
        context,
    })
}

fn decode_cooccurrence(row: &[Value]) -> Option<CooccurrenceCount> {
    let target = row.first()?.as_str()?.to_string();
    let count = row.get(1)?.as_u64()?;
    Some(CooccurrenceCount { target, count })
}

/// Decode rows, skipping the ones that do not match the expected shape.
fn decode_rows<T>(rows: Vec<Vec<Value>>, what: &str, decode: fn(&[Value]) -> Option<T>) -> Vec<T> {
    rows.iter()
        .filter_map(|row| {
            let decoded = decode(row);
            if decoded.is_none() {
                warn!("Skipping malformed {} row from Neo4j: {:?}", what, row);
            }
            decoded
        })
        .collect()
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    async fn direct_edges(&self, ingredient: &str, context: Option<&str>) -> Result<Vec<DirectEdge>> {
        let rows = match context {
            Some(ctx) => {
                self.query(
                    DIRECT_EDGES_IN_CONTEXT,
                    json!({ "ingredient": ingredient, "context": ctx, "limit": self.max_rows }),
                )
                .await?
            }
            None => {
                self.query(
                    DIRECT_EDGES_ANY_CONTEXT,
                    json!({ "ingredient": ingredient, "limit": self.max_rows }),
                )
                .await?
            }
        };
        let edges = decode_rows(rows, "SUBSTITUTES_WITH", decode_direct);
        debug!("Neo4j returned {} direct edges for '{}'", edges.len(), ingredient);
        Ok(edges)
    }

    async fn cooccurrence(&self, ingredient: &str) -> Result<Vec<CooccurrenceCount>> {
        let rows = self
            .query(
                COOCCURRENCE,
                json!({ "ingredient": ingredient, "limit": self.max_rows }),
            )
            .await?;
        let counts = decode_rows(rows, "co-occurrence", decode_cooccurrence);
        debug!("Neo4j returned {} co-occurring ingredients for '{}'", counts.len(), ingredient);
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn graph_for(server: &MockServer) -> Neo4jGraph {
        let settings = Neo4jSettings {
            url: server.uri(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: Some("secret".to_string()),
            max_rows: 20,
        };
        Neo4jGraph::new(&settings, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_direct_edges_decodes_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({
                "statements": [{ "parameters": { "ingredient": "butter", "context": "baking" } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "columns": ["substitute", "score", "context"],
                    "data": [
                        { "row": ["margarine", 0.95, "baking"], "meta": [null, null, null] },
                        { "row": ["coconut oil", 0.8, null], "meta": [null, null, null] },
                        { "row": [null, "bad"], "meta": [] }
                    ]
                }],
                "errors": []
            })))
            .mount(&server)
            .await;

        let graph = graph_for(&server);
        let edges = graph.direct_edges("butter", Some("baking")).await.unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].target, "margarine");
        assert!((edges[0].score - 0.95).abs() < 1e-6);
        assert_eq!(edges[0].context.as_deref(), Some("baking"));
        assert_eq!(edges[1].context, None);
    }

    #[tokio::test]
    async fn test_cooccurrence_decodes_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "columns": ["substitute", "together"],
                    "data": [
                        { "row": ["sugar", 30] },
                        { "row": ["flour", 12] }
                    ]
                }],
                "errors": []
            })))
            .mount(&server)
            .await;

        let counts = graph_for(&server).cooccurrence("butter").await.unwrap();
        assert_eq!(
            counts,
            vec![
                CooccurrenceCount { target: "sugar".into(), count: 30 },
                CooccurrenceCount { target: "flour".into(), count: 12 },
            ]
        );
    }

    #[tokio::test]
    async fn test_neo4j_errors_are_external_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "errors": [{ "code": "Neo.ClientError.Security.Unauthorized", "message": "bad credentials" }]
            })))
            .mount(&server)
            .await;

        let err = graph_for(&server).direct_edges("butter", None).await.unwrap_err();
        assert!(matches!(err, PlannerError::ExternalService { .. }));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_http_failure_is_external_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = graph_for(&server).cooccurrence("butter").await.unwrap_err();
        assert!(matches!(err, PlannerError::ExternalService { .. }));
    }

    #[tokio::test]
    async fn test_slow_database_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "results": [], "errors": [] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let settings = Neo4jSettings {
            url: server.uri(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: None,
            max_rows: 20,
        };
        let graph = Neo4jGraph::new(&settings, Duration::from_millis(50)).unwrap();
        let err = graph.direct_edges("butter", None).await.unwrap_err();
        assert!(matches!(err, PlannerError::ExternalService { .. }));
        assert!(err.to_string().contains("timed out"), "got {}", err);
    }

    #[test]
    fn test_queries_break_ties_by_name() {
        for cypher in [DIRECT_EDGES_IN_CONTEXT, DIRECT_EDGES_ANY_CONTEXT, COOCCURRENCE] {
            assert!(cypher.contains(", substitute ASC\nLIMIT $limit"), "{}", cypher);
        }
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let settings = Neo4jSettings {
            url: "http://db:7474/".to_string(),
            database: "recipes".to_string(),
            user: "neo4j".to_string(),
            password: None,
            max_rows: 0,
        };
        let graph = Neo4jGraph::new(&settings, Duration::from_secs(1)).unwrap();
        assert_eq!(graph.endpoint, "http://db:7474/db/recipes/tx/commit");
        assert_eq!(graph.max_rows, 1);
    }
}
