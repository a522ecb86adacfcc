//! Small in-memory kitchen used by mock mode and tests

use crate::collaborators::{HashEmbedder, InMemoryGraph, InMemoryMetadata, InMemoryVectorIndex};
use crate::config::ScoringDefaults;
use crate::engine::{Collaborators, PlannerEngine, SharedPlannerEngine};
use crate::normalizer::Normalizer;
use crate::types::RecipeId;

pub const DEMO_EMBEDDING_DIM: usize = 128;

/// (id, title, stored ingredient list as found in the recipe dataset)
const RECIPES: &[(&str, &str, &str)] = &[
    ("r1", "Shortbread", "['butter', 'sugar', 'flour']"),
    ("r2", "Sugar Cookies", "['butter', 'sugar', 'flour', 'eggs', 'vanilla', 'sugar']"),
    ("r3", "Pancakes", "['flour', 'milk', 'eggs', 'butter', 'baking powder']"),
    ("r4", "Garlic Bread", "['bread', 'butter', 'garlic', 'parsley']"),
    ("r5", "Honey Glazed Carrots", "['carrots', 'honey', 'butter', 'salt']"),
    ("r6", "Tomato Salsa", "['tomato', 'onion', 'cilantro', 'lime', 'salt']"),
    ("r7", "Vegan Brownies", "['flour', 'cocoa', 'sugar', 'coconut oil', 'flaxseed']"),
    ("r8", "Corrupted Export", "butter; sugar; flour"),
    ("r9", "Banana Bread", "['bananas', 'flour', 'sugar', 'eggs', 'butter', 'baking soda']"),
];

pub fn demo_graph() -> InMemoryGraph {
    let mut graph = InMemoryGraph::new()
        .with_edge("butter", "margarine", 0.95, Some("baking"))
        .with_edge("butter", "ghee", 0.9, Some("sauteing"))
        .with_edge("butter", "coconut oil", 0.8, Some("baking"))
        .with_edge("butter", "olive oil", 0.7, Some("sauteing"))
        .with_edge("eggs", "applesauce", 0.7, Some("baking"))
        .with_edge("eggs", "flaxseed", 0.65, Some("baking"))
        .with_edge("milk", "soy milk", 0.9, None)
        .with_edge("milk", "oat milk", 0.88, None)
        .with_edge("sugar", "honey", 0.8, Some("baking"))
        .with_edge("sugar", "maple syrup", 0.75, None);

    for (_, _, raw) in RECIPES {
        if let Ok(items) = crate::collaborators::parse_ingredient_list("demo", raw) {
            let refs: Vec<&str> = items.iter().map(|s| s.as_str()).collect();
            graph = graph.with_recipe(&refs);
        }
    }
    graph
}

/// Vector index and metadata over the demo recipes
pub fn demo_recipes(embedder: &HashEmbedder) -> (InMemoryVectorIndex, InMemoryMetadata) {
    let mut index = InMemoryVectorIndex::new();
    let mut metadata = InMemoryMetadata::new();
    for (id, title, raw) in RECIPES {
        let id = RecipeId::new(*id);
        let text = raw.replace(|c: char| c == '[' || c == ']' || c == '\'' || c == ',', " ");
        index.insert(id.clone(), embedder.embed_sync(&format!("{} {}", title, text)));
        metadata.insert(id, *title, *raw);
    }
    (index, metadata)
}

pub fn demo_engine() -> SharedPlannerEngine {
    demo_engine_with(Normalizer::default(), ScoringDefaults::default())
}

/// Demo collaborators with a configured normalizer and request defaults
pub fn demo_engine_with(normalizer: Normalizer, defaults: ScoringDefaults) -> SharedPlannerEngine {
    let embedder = HashEmbedder::new(DEMO_EMBEDDING_DIM);
    let (index, metadata) = demo_recipes(&embedder);
    PlannerEngine::new(
        Collaborators {
            graph: Box::new(demo_graph()),
            embedder: Box::new(embedder),
            index: Box::new(index),
            metadata: Box::new(metadata),
        },
        normalizer,
        defaults,
    )
}
