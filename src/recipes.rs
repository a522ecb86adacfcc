//! Recipe ranking: semantic nearest-neighbour retrieval reranked by
//! ingredient overlap

use crate::collaborators::{Embedder, MetadataStore, VectorIndex};
use crate::error::{check_positive, check_unit_weight, Result};
use crate::scoring::{clamp_unit, l2_normalize};
use crate::types::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub struct RecipeRanker<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    metadata: &'a dyn MetadataStore,
}

/// Candidate that passed the overlap filter, before its title is known
struct Survivor {
    id: RecipeId,
    matched: Vec<String>,
    semantic_score: f32,
    overlap_score: f32,
    combined_score: f32,
}

impl<'a> RecipeRanker<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex, metadata: &'a dyn MetadataStore) -> Self {
        Self {
            embedder,
            index,
            metadata,
        }
    }

    /// Main entry point: ranked recipes for a pantry
    pub async fn suggest_recipes(&self, query: &RecipeQuery) -> Result<Vec<RecipeCandidate>> {
        let pantry = validate(query)?;
        if pantry.is_empty() {
            // Nothing can reach min_overlap.
            debug!("Empty pantry after folding, returning no recipes");
            return Ok(Vec::new());
        }

        info!(
            "Suggesting recipes: ingredients={:?} top_n={} rerank_weight={} raw_k={} min_overlap={}",
            pantry, query.top_n, query.rerank_weight, query.raw_k, query.min_overlap
        );

        // Step 1: embed the pantry
        let query_text = pantry.join(" ");
        let vector = l2_normalize(&self.embedder.encode(&query_text).await?);

        // Step 2: nearest neighbours
        let hits = self.index.search(&vector, query.raw_k).await?;
        debug!("Vector index returned {} hits", hits.len());

        let pantry_set: HashSet<&str> = pantry.iter().map(|s| s.as_str()).collect();
        let mut seen_ids: HashSet<RecipeId> = HashSet::new();
        let mut survivors: Vec<Survivor> = Vec::new();
        let mut malformed = 0usize;

        for hit in hits {
            if !seen_ids.insert(hit.id.clone()) {
                continue;
            }

            // Step 3: stored ingredients; a bad record only costs itself
            let stored = match self.metadata.get_ingredients(&hit.id).await {
                Ok(list) => list,
                Err(e) if e.is_malformed() => {
                    warn!("Skipping recipe {}: {}", hit.id, e);
                    malformed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            // Step 4-5: dedupe, then keep only what the pantry covers
            let deduped = dedupe_folded(stored);
            let matched: Vec<String> = deduped
                .into_iter()
                .filter(|i| pantry_set.contains(i.as_str()))
                .collect();
            let overlap = matched.len();
            if overlap < query.min_overlap {
                continue;
            }

            // Step 6: scores
            let semantic_score = clamp_unit(hit.similarity);
            let overlap_score = clamp_unit(overlap as f32 / pantry.len().max(1) as f32);
            let combined_score = combine(semantic_score, overlap_score, query.rerank_weight);

            survivors.push(Survivor {
                id: hit.id,
                matched,
                semantic_score,
                overlap_score,
                combined_score,
            });
        }

        debug!(
            "{} candidates passed min_overlap={} ({} malformed skipped)",
            survivors.len(),
            query.min_overlap,
            malformed
        );

        // Step 7: titles, only for survivors
        let mut results = Vec::with_capacity(survivors.len());
        for s in survivors {
            let title = match self.metadata.get_title(&s.id).await {
                Ok(title) => title,
                Err(e) if e.is_malformed() => {
                    warn!("Skipping recipe {}: {}", s.id, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            results.push(RecipeCandidate {
                recipe_id: s.id,
                title,
                ingredients: s.matched,
                semantic_score: s.semantic_score,
                overlap_score: s.overlap_score,
                combined_score: s.combined_score,
                rank: 0,
            });
        }

        // Step 8: order, truncate, rank
        results.sort_by(recipe_order);
        results.truncate(query.top_n);
        for (idx, r) in results.iter_mut().enumerate() {
            r.rank = idx + 1;
        }

        info!("Suggested {} recipes", results.len());

        Ok(results)
    }
}

/// `clamp((1 - w) * semantic + w * overlap)`
pub fn combine(semantic_score: f32, overlap_score: f32, rerank_weight: f32) -> f32 {
    clamp_unit((1.0 - rerank_weight) * semantic_score + rerank_weight * overlap_score)
}

/// Combined score descending, then title, then id.
fn recipe_order(a: &RecipeCandidate, b: &RecipeCandidate) -> Ordering {
    b.combined_score
        .total_cmp(&a.combined_score)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.recipe_id.cmp(&b.recipe_id))
}

fn fold(ingredient: &str) -> String {
    ingredient.trim().to_lowercase()
}

/// Fold case and whitespace, drop blanks and repeats, keep first occurrence.
fn dedupe_folded<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|i| fold(&i))
        .filter(|i| !i.is_empty() && seen.insert(i.clone()))
        .collect()
}

/// Reject out-of-contract parameters and return the folded pantry.
fn validate(query: &RecipeQuery) -> Result<Vec<String>> {
    check_positive("top_n", query.top_n)?;
    check_positive("raw_k", query.raw_k)?;
    check_positive("min_overlap", query.min_overlap)?;
    check_unit_weight("rerank_weight", query.rerank_weight)?;

    Ok(dedupe_folded(query.ingredients.iter().cloned()))
}

impl RecipeQuery {
    pub fn new<I, S>(ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            top_n: 5,
            rerank_weight: 0.6,
            raw_k: 50,
            min_overlap: 2,
        }
    }
}
