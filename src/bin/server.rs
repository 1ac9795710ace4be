//! Form Finder HTTP Server

use axum::{
    extract::Json,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use form_finder::prelude::*;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    problem: Problem,
    chromosome: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    problem: Problem,
}

#[derive(Debug, Serialize)]
struct EvaluateResults {
    basis: Individual,
    individual: Individual,
    frame: Frame,
}

#[derive(Debug, Serialize)]
struct SearchResults {
    report: SearchReport,
    basis: Option<FrameId>,
    individuals: Vec<Individual>,
    generations: usize,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<T>,
}

fn respond<T: Serialize>(outcome: anyhow::Result<T>) -> (StatusCode, Json<ApiResponse<T>>) {
    match outcome {
        Ok(results) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                error: None,
                results: Some(results),
            }),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                success: false,
                error: Some(format!("{e:#}")),
                results: None,
            }),
        ),
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn evaluate(Json(request): Json<EvaluateRequest>) -> impl IntoResponse {
    let outcome = tokio::task::spawn_blocking(move || run_evaluation(request))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);
    respond(outcome)
}

async fn search_problem(Json(request): Json<SearchRequest>) -> impl IntoResponse {
    let outcome = tokio::task::spawn_blocking(move || run_search(request))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);
    respond(outcome)
}

fn run_evaluation(request: EvaluateRequest) -> anyhow::Result<EvaluateResults> {
    let mut evaluator = Evaluator::from_problem(request.problem)?;
    let basis = evaluator.evaluate_basis()?;
    let id = evaluator.evaluate(request.chromosome)?.frame;

    let run = evaluator.run();
    Ok(EvaluateResults {
        basis: run.individual(basis)?.clone(),
        individual: run.individual(id)?.clone(),
        frame: run.frame(id)?.clone(),
    })
}

fn run_search(request: SearchRequest) -> anyhow::Result<SearchResults> {
    let config = request.problem.config.clone();
    let mut evaluator = Evaluator::from_problem(request.problem)?;
    let report = search(&mut evaluator, &config, &CancelToken::new())?;

    let run = evaluator.into_run();
    let mut individuals: Vec<Individual> = run.individuals.into_values().collect();
    individuals.sort_by(|a, b| a.weighted_fitness.total_cmp(&b.weighted_fitness));
    Ok(SearchResults {
        report,
        basis: run.basis,
        individuals,
        generations: run.generations.len(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/evaluate", post(evaluate))
        .route("/api/v1/search", post(search_problem))
        .layer(cors);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8086);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    println!("Form Finder Server listening on http://{}", addr);
    println!("  Health check: GET  /health");
    println!("  Evaluate:     POST /api/v1/evaluate");
    println!("  Search:       POST /api/v1/search");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
