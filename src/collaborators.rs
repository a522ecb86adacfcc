//! Collaborator contracts consumed by the ranking engines, plus in-memory
//! implementations for tests and demo mode

use crate::error::{PlannerError, Result};
use crate::scoring::{cosine_similarity, l2_normalize};
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;

/// Read access to the ingredient graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// `SUBSTITUTES_WITH` edges leaving `ingredient`, restricted to edges
    /// tagged with `context` when one is given.
    async fn direct_edges(&self, ingredient: &str, context: Option<&str>) -> Result<Vec<DirectEdge>>;

    /// Ingredients sharing recipes with `ingredient`, with the number of
    /// shared recipes.
    async fn cooccurrence(&self, ingredient: &str) -> Result<Vec<CooccurrenceCount>>;
}

/// Nearest-neighbour search over stored recipe vectors
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorHit>>;
}

/// Stored recipe records
#[async_trait]
pub trait MetadataStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw ingredient list, possibly with duplicates. A record that cannot
    /// be parsed yields `PlannerError::MalformedData`.
    async fn get_ingredients(&self, id: &RecipeId) -> Result<Vec<String>>;

    async fn get_title(&self, id: &RecipeId) -> Result<String>;
}

/// Text embedding model
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;

    fn dimension(&self) -> usize;

    async fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

/// Parse a stored ingredient list.
///
/// Accepts JSON arrays and the Python list literals found in the recipe
/// dataset (`['butter', "baker's chocolate"]`).
pub fn parse_ingredient_list(record: &str, raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
        return Ok(items);
    }

    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| PlannerError::malformed(record, "ingredient list is not a list"))?;

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.peek().map_or(false, |c| c.is_whitespace()) {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(c) => {
                return Err(PlannerError::malformed(
                    record,
                    format!("unexpected character {:?} in ingredient list", c),
                ))
            }
        };

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => item.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return Err(PlannerError::malformed(record, "unterminated string in ingredient list"));
        }
        items.push(item);

        while chars.peek().map_or(false, |c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(c) => {
                return Err(PlannerError::malformed(
                    record,
                    format!("expected ',' in ingredient list, found {:?}", c),
                ))
            }
        }
    }

    Ok(items)
}

/// In-memory ingredient graph
#[derive(Debug, Default, Clone)]
pub struct InMemoryGraph {
    edges: HashMap<String, Vec<DirectEdge>>,
    recipes: Vec<Vec<String>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edge(mut self, from: &str, to: &str, score: f32, context: Option<&str>) -> Self {
        self.edges.entry(from.to_string()).or_default().push(DirectEdge {
            target: to.to_string(),
            score,
            context: context.map(|c| c.to_string()),
        });
        self
    }

    /// Add a recipe node connected to each listed ingredient.
    pub fn with_recipe(mut self, ingredients: &[&str]) -> Self {
        self.recipes.push(ingredients.iter().map(|i| i.to_string()).collect());
        self
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    fn name(&self) -> &'static str {
        "in_memory_graph"
    }

    async fn direct_edges(&self, ingredient: &str, context: Option<&str>) -> Result<Vec<DirectEdge>> {
        let edges = self.edges.get(ingredient).cloned().unwrap_or_default();
        Ok(match context {
            Some(ctx) => edges
                .into_iter()
                .filter(|e| e.context.as_deref() == Some(ctx))
                .collect(),
            None => edges,
        })
    }

    async fn cooccurrence(&self, ingredient: &str) -> Result<Vec<CooccurrenceCount>> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for recipe in self.recipes.iter().filter(|r| r.iter().any(|i| i == ingredient)) {
            let mut seen: Vec<&str> = Vec::new();
            for other in recipe.iter().filter(|i| *i != ingredient) {
                if !seen.contains(&other.as_str()) {
                    seen.push(other);
                    *counts.entry(other).or_insert(0) += 1;
                }
            }
        }
        let mut out: Vec<CooccurrenceCount> = counts
            .into_iter()
            .map(|(target, count)| CooccurrenceCount {
                target: target.to_string(),
                count,
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.target.cmp(&b.target)));
        Ok(out)
    }
}

/// Brute-force cosine index over unit vectors
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorIndex {
    entries: Vec<(RecipeId, Vec<f32>)>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: RecipeId, vector: Vec<f32>) {
        self.entries.push((id, l2_normalize(&vector)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &'static str {
        "in_memory_vector_index"
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        let mut hits: Vec<VectorHit> = self
            .entries
            .iter()
            .map(|(id, v)| VectorHit {
                id: id.clone(),
                similarity: cosine_similarity(vector, v),
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }
}

/// Recipe records stored as raw strings, parsed on read
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetadata {
    records: HashMap<RecipeId, (String, String)>, // (title, raw ingredient list)
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: RecipeId, title: impl Into<String>, raw_ingredients: impl Into<String>) {
        self.records.insert(id, (title.into(), raw_ingredients.into()));
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadata {
    fn name(&self) -> &'static str {
        "in_memory_metadata"
    }

    async fn get_ingredients(&self, id: &RecipeId) -> Result<Vec<String>> {
        let (_, raw) = self
            .records
            .get(id)
            .ok_or_else(|| PlannerError::malformed(id.as_str(), "no such recipe"))?;
        parse_ingredient_list(id.as_str(), raw)
    }

    async fn get_title(&self, id: &RecipeId) -> Result<String> {
        self.records
            .get(id)
            .map(|(title, _)| title.clone())
            .ok_or_else(|| PlannerError::malformed(id.as_str(), "no such recipe"))
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic FNV-1a bag-of-words embedder. Not semantic; shared
/// tokens produce similar vectors, which is enough for demo mode and tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a_hash(token.to_lowercase().as_bytes());
            let index = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 1 { 1.0 } else { -1.0 };
            embedding[index] += sign;
        }
        l2_normalize(&embedding)
    }
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash_embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
