//! Read-only HTTP surface over the quiz dataset.
//!
//! # Responsibility
//! - Route GET requests to the query facade.
//! - Keep the legacy response shapes: `{"result": [...]}` listings, plain
//!   text sentinels for misses, 302 redirects for random picks.
//!
//! # See also
//! - `quizgraph_core::service::query` for the reads behind every route.

mod handlers;
mod state;

pub use state::AppState;

use axum::routing::get;
use axum::Router;
use log::info;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/index", get(handlers::index))
        .route("/quizzes", get(handlers::all_quizzes))
        .route("/quizzes/", get(handlers::all_quizzes))
        .route("/quizzes/all", get(handlers::all_quizzes))
        .route("/quizzes/random", get(handlers::random_quiz))
        .route("/quizzes/id/:id", get(handlers::quiz_by_id))
        .route("/quizzes/id/:id/", get(handlers::quiz_by_id))
        .route("/quizzes/id/:id/questions", get(handlers::quiz_by_id))
        .route(
            "/quizzes/id/:id/questions/:number",
            get(handlers::question_by_quiz_id),
        )
        .route("/quizzes/name/:name", get(handlers::quiz_by_name))
        .route("/quizzes/name/:name/", get(handlers::quiz_by_name))
        .route("/quizzes/name/:name/questions", get(handlers::quiz_by_name))
        .route(
            "/quizzes/name/:name/questions/:number",
            get(handlers::question_by_quiz_name),
        )
        .route("/random", get(handlers::random_quiz))
        .route("/random/quiz", get(handlers::random_quiz))
        .route("/random/question", get(handlers::random_question))
        .route("/addresses", get(handlers::addresses))
        .route("/addresses/", get(handlers::addresses))
        .route("/addresses/all", get(handlers::addresses))
        .route("/addresses/parsed", get(handlers::parsed_addresses))
        .with_state(state)
}

/// Binds `bind_addr` and serves until the process stops.
pub async fn serve(state: AppState, bind_addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(
        "event=http_listen module=api status=ok addr={}",
        listener.local_addr()?
    );
    axum::serve(listener, router(state)).await
}
