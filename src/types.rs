//! Core type definitions for substitution and recipe ranking

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence tier of a canonical ingredient key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Strong,   // two or more tokens survived filtering
    Weak,     // exactly one token survived
    Fallback, // nothing survived; last raw subword used
}

/// Result of normalizing free-form ingredient text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedIngredient {
    pub raw: String,
    pub canonical: String,
    pub tier: Tier,
}

impl NormalizedIngredient {
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionSource {
    Direct,
    Cooccurrence,
    Hybrid,
}

/// Which lookup strategy the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionMode {
    Direct,
    Hybrid,
}

/// Whether the context-filtered direct lookup produced the edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Matched,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstitutionCandidate {
    pub name: String,
    pub score: f32, // 0.0-1.0
    pub context: Option<String>,
    pub source: SubstitutionSource,
}

/// Ranked substitutes plus the lookup provenance
#[derive(Debug, Clone, Serialize)]
pub struct Substitutes {
    pub query: NormalizedIngredient,
    pub match_mode: MatchMode,
    pub candidates: Vec<SubstitutionCandidate>,
}

/// Parameters of one substitution lookup
#[derive(Debug, Clone)]
pub struct SubstituteRequest {
    pub ingredient: String,
    pub context: Option<String>,
    pub top_k: usize,
    pub alpha: f32,
    pub mode: SubstitutionMode,
}

/// Parameters of one recipe suggestion
#[derive(Debug, Clone)]
pub struct RecipeQuery {
    pub ingredients: Vec<String>,
    pub top_n: usize,
    pub rerank_weight: f32,
    pub raw_k: usize,
    pub min_overlap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeCandidate {
    pub recipe_id: RecipeId,
    pub title: String,
    pub ingredients: Vec<String>, // overlap with the query, stored order
    pub semantic_score: f32,
    pub overlap_score: f32,
    pub combined_score: f32,
    pub rank: usize,
}

/// Opaque identifier of a stored recipe
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub String);

impl RecipeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `SUBSTITUTES_WITH` edge as returned by the graph store
#[derive(Debug, Clone, PartialEq)]
pub struct DirectEdge {
    pub target: String,
    pub score: f32,
    pub context: Option<String>,
}

/// Number of recipes in which `target` appears next to the queried ingredient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooccurrenceCount {
    pub target: String,
    pub count: u64,
}

/// Nearest-neighbour hit from the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: RecipeId,
    pub similarity: f32,
}
