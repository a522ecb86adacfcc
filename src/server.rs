//! HTTP server for substitution and recipe suggestion

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    MatchMode, NormalizedIngredient, PlannerError, RecipeCandidate, RecipeQuery, SharedPlannerEngine,
    SubstituteRequest, SubstitutionCandidate, SubstitutionMode,
};

#[derive(Debug, Deserialize)]
pub struct SubstituteParams {
    pub ingredient: String,
    pub context: Option<String>,
    #[serde(default)]
    pub hybrid: bool,
    pub top_k: Option<usize>,
    pub alpha: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct SubstituteResponse {
    pub ingredient: String,
    pub canonical: String,
    pub context: String,
    pub hybrid: bool,
    pub match_mode: MatchMode,
    pub substitutes: Vec<SubstitutionCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRecipesRequest {
    pub ingredients: Vec<String>,
    pub top_n: Option<usize>,
    pub rerank_weight: Option<f32>,
    pub raw_k: Option<usize>,
    pub min_overlap: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SuggestRecipesResponse {
    pub input_ingredients: Vec<String>,
    pub top_n: usize,
    pub results: Vec<RecipeCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeParams {
    pub text: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: PlannerError) -> ApiError {
    let (status, label) = match &err {
        PlannerError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        PlannerError::ExternalService { .. } => (StatusCode::BAD_GATEWAY, "Upstream service failed"),
        PlannerError::MalformedData { .. } | PlannerError::Config(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    };
    if status == StatusCode::BAD_REQUEST {
        warn!("Rejected request: {}", err);
    } else {
        error!("Request failed: {:?}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: label.to_string(),
            details: Some(err.to_string()),
        }),
    )
}

async fn substitute_handler(
    State(engine): State<SharedPlannerEngine>,
    Query(params): Query<SubstituteParams>,
) -> Result<Json<SubstituteResponse>, ApiError> {
    info!(
        "Received substitute request: ingredient='{}', context={:?}, hybrid={}",
        params.ingredient, params.context, params.hybrid
    );

    let defaults = engine.defaults();
    let req = SubstituteRequest {
        ingredient: params.ingredient.clone(),
        context: params.context.clone(),
        top_k: params.top_k.unwrap_or(defaults.top_k),
        alpha: params.alpha.unwrap_or(defaults.alpha),
        mode: SubstitutionMode::from_hybrid_flag(params.hybrid),
    };

    let out = engine.resolve_substitutes(&req).await.map_err(error_response)?;

    Ok(Json(SubstituteResponse {
        ingredient: params.ingredient,
        canonical: out.query.canonical,
        context: params.context.unwrap_or_else(|| "fallback".to_string()),
        hybrid: params.hybrid,
        match_mode: out.match_mode,
        substitutes: out.candidates,
    }))
}

async fn suggest_recipes_handler(
    State(engine): State<SharedPlannerEngine>,
    Json(req): Json<SuggestRecipesRequest>,
) -> Result<Json<SuggestRecipesResponse>, ApiError> {
    info!("Received recipe request: {} ingredients", req.ingredients.len());

    let defaults = engine.defaults();
    let query = RecipeQuery {
        ingredients: req.ingredients.clone(),
        top_n: req.top_n.unwrap_or(defaults.top_n),
        rerank_weight: req.rerank_weight.unwrap_or(defaults.rerank_weight),
        raw_k: req.raw_k.unwrap_or(defaults.raw_k),
        min_overlap: req.min_overlap.unwrap_or(defaults.min_overlap),
    };

    let results = engine.suggest_recipes(&query).await.map_err(error_response)?;

    Ok(Json(SuggestRecipesResponse {
        input_ingredients: req.ingredients,
        top_n: query.top_n,
        results,
    }))
}

async fn normalize_handler(
    State(engine): State<SharedPlannerEngine>,
    Query(params): Query<NormalizeParams>,
) -> Json<NormalizedIngredient> {
    Json(engine.normalize(&params.text))
}

/// Health check handler
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "plateplanner".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create and configure the HTTP server
pub fn create_router(engine: SharedPlannerEngine) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/normalize", get(normalize_handler))
        .route("/substitute", get(substitute_handler))
        .route("/suggest_recipes", post(suggest_recipes_handler))
        .with_state(engine)
}

/// Run the HTTP server
pub async fn run_server(engine: SharedPlannerEngine, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting Plate Planner server on {}", addr);

    let app = create_router(engine);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
