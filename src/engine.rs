//! Shared, immutable engine context
//!
//! Built once at start-up and shared behind an `Arc`; every request borrows
//! the collaborator handles and configuration read-only.

use crate::collaborators::{Embedder, GraphStore, MetadataStore, VectorIndex};
use crate::config::ScoringDefaults;
use crate::error::Result;
use crate::normalizer::Normalizer;
use crate::recipes::RecipeRanker;
use crate::substitution::SubstitutionEngine;
use crate::types::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Collaborator handles the engines read from
pub struct Collaborators {
    pub graph: Box<dyn GraphStore>,
    pub embedder: Box<dyn Embedder>,
    pub index: Box<dyn VectorIndex>,
    pub metadata: Box<dyn MetadataStore>,
}

/// Main planner engine (thread-safe via Arc)
pub struct PlannerEngine {
    collaborators: Collaborators,
    normalizer: Normalizer,
    defaults: ScoringDefaults,
}

pub type SharedPlannerEngine = Arc<PlannerEngine>;

impl PlannerEngine {
    pub fn new(
        collaborators: Collaborators,
        normalizer: Normalizer,
        defaults: ScoringDefaults,
    ) -> SharedPlannerEngine {
        info!(
            "Planner engine ready: graph={}, embedder={} (dim {}), index={}, metadata={}",
            collaborators.graph.name(),
            collaborators.embedder.name(),
            collaborators.embedder.dimension(),
            collaborators.index.name(),
            collaborators.metadata.name()
        );
        Arc::new(Self {
            collaborators,
            normalizer,
            defaults,
        })
    }

    pub fn defaults(&self) -> &ScoringDefaults {
        &self.defaults
    }

    pub fn normalize(&self, raw: &str) -> NormalizedIngredient {
        self.normalizer.normalize(raw)
    }

    /// Ranked substitutes for one ingredient
    pub async fn resolve_substitutes(&self, req: &SubstituteRequest) -> Result<Substitutes> {
        let start = Instant::now();
        let engine = SubstitutionEngine::new(
            self.collaborators.graph.as_ref(),
            &self.normalizer,
            self.defaults.cooccurrence_normalizer,
        );
        let out = engine.resolve_substitutes(req).await?;
        info!("Substitution lookup took {}ms", start.elapsed().as_millis());
        Ok(out)
    }

    /// Ranked recipes for a set of pantry ingredients
    pub async fn suggest_recipes(&self, query: &RecipeQuery) -> Result<Vec<RecipeCandidate>> {
        let start = Instant::now();
        let ranker = RecipeRanker::new(
            self.collaborators.embedder.as_ref(),
            self.collaborators.index.as_ref(),
            self.collaborators.metadata.as_ref(),
        );
        let out = ranker.suggest_recipes(query).await?;
        info!("Recipe suggestion took {}ms", start.elapsed().as_millis());
        Ok(out)
    }
}
