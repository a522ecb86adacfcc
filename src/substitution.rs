//! Substitution fusion: direct `SUBSTITUTES_WITH` edges, optionally fused
//! with co-occurrence statistics

use crate::collaborators::GraphStore;
use crate::error::{check_positive, check_unit_weight, Result};
use crate::normalizer::Normalizer;
use crate::scoring::{clamp_unit, fuse, rank_order};
use crate::types::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Default divisor turning co-occurrence counts into pseudo-scores
pub const DEFAULT_COOCCURRENCE_NORMALIZER: f32 = 50.0;

/// Resolves substitutes against a graph store. Borrowed per call; holds no
/// state of its own.
pub struct SubstitutionEngine<'a> {
    graph: &'a dyn GraphStore,
    normalizer: &'a Normalizer,
    cooccurrence_normalizer: f32,
}

impl<'a> SubstitutionEngine<'a> {
    pub fn new(graph: &'a dyn GraphStore, normalizer: &'a Normalizer, cooccurrence_normalizer: f32) -> Self {
        Self {
            graph,
            normalizer,
            cooccurrence_normalizer,
        }
    }

    /// Main entry point: ranked substitutes for one ingredient
    pub async fn resolve_substitutes(&self, req: &SubstituteRequest) -> Result<Substitutes> {
        validate(req)?;

        let query = self.normalizer.normalize(&req.ingredient);
        let context = clean_context(req.context.as_deref());

        info!(
            "Resolving substitutes: ingredient='{}' canonical='{}' tier={:?} context={:?} mode={:?}",
            req.ingredient, query.canonical, query.tier, context, req.mode
        );

        if query.is_empty() {
            debug!("No usable token in '{}', returning empty result", req.ingredient);
            return Ok(Substitutes {
                query,
                match_mode: MatchMode::Fallback,
                candidates: Vec::new(),
            });
        }

        // Step 1: direct edges, context-filtered first
        let (edges, match_mode) = self.direct_lookup(&query.canonical, context.as_deref()).await?;
        let direct = direct_candidates(&query.canonical, edges);
        debug!("{} direct candidates ({:?})", direct.len(), match_mode);

        let candidates = match req.mode {
            SubstitutionMode::Direct => {
                let mut direct = direct;
                direct.sort_by(|a, b| rank_order(a.score, &a.name, b.score, &b.name));
                direct.truncate(req.top_k);
                direct
            }
            SubstitutionMode::Hybrid => {
                // Step 2: co-occurrence pseudo-scores
                let cooc = self.cooccurrence_lookup(&query.canonical).await?;
                debug!("{} co-occurrence candidates", cooc.len());

                // Step 3: fuse
                hybrid_merge(direct, cooc, req.alpha, req.top_k)
            }
        };

        info!(
            "Resolved {} substitutes for '{}' ({:?})",
            candidates.len(),
            query.canonical,
            match_mode
        );

        Ok(Substitutes {
            query,
            match_mode,
            candidates,
        })
    }

    async fn direct_lookup(&self, ingredient: &str, context: Option<&str>) -> Result<(Vec<DirectEdge>, MatchMode)> {
        if let Some(ctx) = context {
            let edges = self.graph.direct_edges(ingredient, Some(ctx)).await?;
            if !edges.is_empty() {
                return Ok((edges, MatchMode::Matched));
            }
            debug!("No '{}' edges for context '{}', falling back to all contexts", ingredient, ctx);
        }
        let edges = self.graph.direct_edges(ingredient, None).await?;
        Ok((edges, MatchMode::Fallback))
    }

    async fn cooccurrence_lookup(&self, ingredient: &str) -> Result<Vec<SubstitutionCandidate>> {
        let counts = self.graph.cooccurrence(ingredient).await?;

        let mut best: BTreeMap<String, f32> = BTreeMap::new();
        for c in counts.into_iter().filter(|c| c.target != ingredient) {
            let score = clamp_unit(c.count as f32 / self.cooccurrence_normalizer);
            let slot = best.entry(c.target).or_insert(score);
            *slot = slot.max(score);
        }

        Ok(best
            .into_iter()
            .map(|(name, score)| SubstitutionCandidate {
                name,
                score,
                context: None,
                source: SubstitutionSource::Cooccurrence,
            })
            .collect())
    }
}

fn validate(req: &SubstituteRequest) -> Result<()> {
    check_positive("top_k", req.top_k)?;
    check_unit_weight("alpha", req.alpha)?;
    Ok(())
}

/// Trim and lowercase; blank means no context.
fn clean_context(context: Option<&str>) -> Option<String> {
    context
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
}

/// Clamp edge weights and collapse repeated targets onto their best edge.
fn direct_candidates(ingredient: &str, edges: Vec<DirectEdge>) -> Vec<SubstitutionCandidate> {
    let mut best: BTreeMap<String, SubstitutionCandidate> = BTreeMap::new();
    for edge in edges.into_iter().filter(|e| e.target != ingredient) {
        let score = clamp_unit(edge.score);
        let keep_existing = best.get(&edge.target).map_or(false, |existing| existing.score >= score);
        if !keep_existing {
            best.insert(
                edge.target.clone(),
                SubstitutionCandidate {
                    name: edge.target,
                    score,
                    context: edge.context,
                    source: SubstitutionSource::Direct,
                },
            );
        }
    }
    best.into_values().collect()
}

/// Union both candidate sets, fuse their scores and rank.
fn hybrid_merge(
    direct: Vec<SubstitutionCandidate>,
    cooc: Vec<SubstitutionCandidate>,
    alpha: f32,
    top_k: usize,
) -> Vec<SubstitutionCandidate> {
    let mut union: BTreeMap<String, (Option<SubstitutionCandidate>, Option<f32>)> = BTreeMap::new();
    for d in direct {
        let name = d.name.clone();
        union.entry(name).or_default().0 = Some(d);
    }
    for c in cooc {
        union.entry(c.name).or_default().1 = Some(c.score);
    }

    let mut merged: Vec<SubstitutionCandidate> = union
        .into_iter()
        .map(|(name, (direct, cooc_score))| {
            let direct_score = direct.as_ref().map(|d| d.score);
            SubstitutionCandidate {
                score: fuse(direct_score, cooc_score, alpha),
                context: direct.and_then(|d| d.context),
                source: SubstitutionSource::Hybrid,
                name,
            }
        })
        .collect();

    merged.sort_by(|a, b| rank_order(a.score, &a.name, b.score, &b.name));
    merged.truncate(top_k);
    merged
}

impl SubstitutionMode {
    pub fn from_hybrid_flag(hybrid: bool) -> Self {
        if hybrid {
            SubstitutionMode::Hybrid
        } else {
            SubstitutionMode::Direct
        }
    }
}

impl SubstituteRequest {
    pub fn new(ingredient: impl Into<String>, top_k: usize, alpha: f32, mode: SubstitutionMode) -> Self {
        Self {
            ingredient: ingredient.into(),
            context: None,
            top_k,
            alpha,
            mode,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
