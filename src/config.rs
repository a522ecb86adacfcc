//! Environment-driven configuration, resolved once at start-up

use crate::error::{check_positive, check_unit_weight, PlannerError, Result};
use crate::substitution::DEFAULT_COOCCURRENCE_NORMALIZER;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Request defaults applied when a caller omits a parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringDefaults {
    pub alpha: f32,
    pub cooccurrence_normalizer: f32,
    pub top_k: usize,
    pub top_n: usize,
    pub rerank_weight: f32,
    pub raw_k: usize,
    pub min_overlap: usize,
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        Self {
            alpha: 0.9,
            cooccurrence_normalizer: DEFAULT_COOCCURRENCE_NORMALIZER,
            top_k: 5,
            top_n: 5,
            rerank_weight: 0.6,
            raw_k: 50,
            min_overlap: 2,
        }
    }
}

impl ScoringDefaults {
    pub fn validate(&self) -> Result<()> {
        check_unit_weight("alpha", self.alpha)?;
        check_unit_weight("rerank_weight", self.rerank_weight)?;
        check_positive("top_k", self.top_k)?;
        check_positive("top_n", self.top_n)?;
        check_positive("raw_k", self.raw_k)?;
        check_positive("min_overlap", self.min_overlap)?;
        if !(self.cooccurrence_normalizer.is_finite() && self.cooccurrence_normalizer > 0.0) {
            return Err(PlannerError::Validation(format!(
                "cooccurrence_normalizer must be positive, got {}",
                self.cooccurrence_normalizer
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub max_rows: usize,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub neo4j: Neo4jSettings,
    pub embedding_service_url: String,
    pub embedding_dim: usize,
    pub vector_service_url: String,
    pub metadata_service_url: String,
    pub request_timeout: Duration,
    pub normalizer_config: Option<PathBuf>,
    pub wordlist: Option<PathBuf>,
    pub scoring: ScoringDefaults,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let string_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let defaults = ScoringDefaults::default();
        let scoring = ScoringDefaults {
            alpha: parse_or(&get, "PLATEPLANNER_ALPHA", defaults.alpha)?,
            cooccurrence_normalizer: parse_or(
                &get,
                "PLATEPLANNER_COOCCURRENCE_NORMALIZER",
                defaults.cooccurrence_normalizer,
            )?,
            top_k: parse_or(&get, "PLATEPLANNER_TOP_K", defaults.top_k)?,
            top_n: parse_or(&get, "PLATEPLANNER_TOP_N", defaults.top_n)?,
            rerank_weight: parse_or(&get, "PLATEPLANNER_RERANK_WEIGHT", defaults.rerank_weight)?,
            raw_k: parse_or(&get, "PLATEPLANNER_RAW_K", defaults.raw_k)?,
            min_overlap: parse_or(&get, "PLATEPLANNER_MIN_OVERLAP", defaults.min_overlap)?,
        };
        scoring
            .validate()
            .map_err(|e| PlannerError::Config(e.to_string()))?;

        let timeout_secs: u64 = parse_or(&get, "PLATEPLANNER_REQUEST_TIMEOUT_SECS", 10)?;

        Ok(Self {
            port: parse_or(&get, "PLATEPLANNER_PORT", 8081)?,
            neo4j: Neo4jSettings {
                url: string_or("NEO4J_URL", "http://127.0.0.1:7474"),
                database: string_or("NEO4J_DATABASE", "neo4j"),
                user: string_or("NEO4J_USER", "neo4j"),
                password: get("NEO4J_PASSWORD"),
                max_rows: parse_or(&get, "NEO4J_MAX_ROWS", 200)?,
            },
            embedding_service_url: string_or("EMBEDDING_SERVICE_URL", "http://127.0.0.1:8083"),
            embedding_dim: parse_or(&get, "EMBEDDING_DIM", 384)?,
            vector_service_url: string_or("VECTOR_SERVICE_URL", "http://127.0.0.1:8084"),
            metadata_service_url: string_or("METADATA_SERVICE_URL", "http://127.0.0.1:8085"),
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            normalizer_config: get("PLATEPLANNER_NORMALIZER_CONFIG").map(PathBuf::from),
            wordlist: get("PLATEPLANNER_WORDLIST").map(PathBuf::from),
            scoring,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PlannerError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}
