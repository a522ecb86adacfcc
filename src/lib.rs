//! Plate Planner - ingredient substitution and recipe ranking
//!
//! Fuses weak, heterogeneous signals into deterministic rankings:
//! - Ingredient normalization to canonical lookup keys
//! - Substitutes from graph edges, optionally fused with co-occurrence
//! - Recipes from embedding similarity reranked by pantry overlap

pub mod types;
pub mod error;
pub mod config;
pub mod normalizer;
pub mod scoring;
pub mod collaborators;
pub mod substitution;
pub mod recipes;
pub mod engine;
pub mod neo4j_client;
pub mod recipe_index_client;
pub mod demo;
pub mod server;

pub use types::*;
pub use error::{PlannerError, Result};
pub use config::{ScoringDefaults, Settings};
pub use normalizer::{Normalizer, NormalizerConfig, WordSegmenter};
pub use collaborators::{
    Embedder, GraphStore, HashEmbedder, InMemoryGraph, InMemoryMetadata, InMemoryVectorIndex,
    MetadataStore, VectorIndex,
};
pub use engine::{Collaborators, PlannerEngine, SharedPlannerEngine};
pub use neo4j_client::Neo4jGraph;
pub use recipe_index_client::{HttpEmbedder, HttpMetadataStore, HttpVectorIndex};
