//! Route handlers.
//!
//! # Responsibility
//! - Translate query outcomes into JSON bodies, redirects or the plain-text
//!   sentinels older clients match on.
//!
//! # Invariants
//! - Lookup misses answer with a sentinel, never an error status.
//! - Store failures answer 500 with a fixed body; details only go to the log.

use crate::state::{ApiError, AppState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use quizgraph_core::{Collection, ExpandedQuestion, ExpandedQuiz, ObjectId, QueryError};
use serde_json::json;

pub(crate) const WELCOME: &str = "Welcome to the Quibble API!";
pub(crate) const QUIZ_NOT_FOUND: &str = "Quiz not found";
pub(crate) const QUESTION_OUT_OF_BOUNDS: &str = "Question out of bounds";
pub(crate) const QUESTION_NOT_FOUND: &str = "Question not found";
const INTERNAL_ERROR: &str = "internal error";

pub(crate) async fn index() -> &'static str {
    WELCOME
}

pub(crate) async fn all_quizzes(State(state): State<AppState>) -> Response {
    match state.query("all_quizzes", |facade| facade.all_quizzes()).await {
        Ok(quizzes) => Json(json!({ "result": quizzes })).into_response(),
        Err(_) => internal_error(),
    }
}

pub(crate) async fn quiz_by_id(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = ObjectId::parse_str(&id) else {
        return QUIZ_NOT_FOUND.into_response();
    };
    quiz_reply(
        state
            .query("quiz_by_id", move |facade| facade.expanded_quiz_by_id(id))
            .await,
    )
}

pub(crate) async fn quiz_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    quiz_reply(
        state
            .query("quiz_by_name", move |facade| facade.expanded_quiz_by_name(&name))
            .await,
    )
}

pub(crate) async fn question_by_quiz_id(
    State(state): State<AppState>,
    Path((id, number)): Path<(String, usize)>,
) -> Response {
    let Ok(id) = ObjectId::parse_str(&id) else {
        return QUIZ_NOT_FOUND.into_response();
    };
    question_reply(
        state
            .query("question_by_quiz_id", move |facade| {
                let quiz = facade.quiz_by_id(id)?;
                facade.quiz_question(&quiz, number)
            })
            .await,
    )
}

pub(crate) async fn question_by_quiz_name(
    State(state): State<AppState>,
    Path((name, number)): Path<(String, usize)>,
) -> Response {
    question_reply(
        state
            .query("question_by_quiz_name", move |facade| {
                let quiz = facade.quiz_by_name(&name)?;
                facade.quiz_question(&quiz, number)
            })
            .await,
    )
}

pub(crate) async fn random_quiz(State(state): State<AppState>) -> Response {
    let picked = state
        .query("random_quiz", |facade| {
            facade.random_complete_quiz(&mut rand::thread_rng())
        })
        .await;
    match picked {
        Ok(id) => found(format!("/quizzes/id/{id}")),
        Err(ApiError::Query(QueryError::NoCompleteQuiz)) => {
            (StatusCode::NOT_FOUND, QUIZ_NOT_FOUND).into_response()
        }
        Err(_) => internal_error(),
    }
}

pub(crate) async fn random_question(State(state): State<AppState>) -> Response {
    let picked = state
        .query("random_question", |facade| {
            facade.random_question(&mut rand::thread_rng())
        })
        .await;
    match picked {
        Ok((id, number)) => found(format!("/quizzes/id/{id}/questions/{number}")),
        Err(ApiError::Query(QueryError::NoCompleteQuiz)) => {
            (StatusCode::NOT_FOUND, QUIZ_NOT_FOUND).into_response()
        }
        Err(_) => internal_error(),
    }
}

pub(crate) async fn addresses(State(state): State<AppState>) -> Response {
    match state.query("addresses", |facade| facade.addresses()).await {
        Ok(addresses) => Json(addresses).into_response(),
        Err(_) => internal_error(),
    }
}

pub(crate) async fn parsed_addresses(State(state): State<AppState>) -> Response {
    match state
        .query("parsed_addresses", |facade| facade.parsed_addresses())
        .await
    {
        Ok(addresses) => Json(addresses).into_response(),
        Err(_) => internal_error(),
    }
}

fn quiz_reply(result: Result<ExpandedQuiz, ApiError>) -> Response {
    match result {
        Ok(quiz) => Json(quiz).into_response(),
        Err(ApiError::Query(QueryError::NotFound { .. })) => QUIZ_NOT_FOUND.into_response(),
        Err(_) => internal_error(),
    }
}

fn question_reply(result: Result<ExpandedQuestion, ApiError>) -> Response {
    match result {
        Ok(question) => Json(question).into_response(),
        Err(ApiError::Query(QueryError::NotFound {
            collection: Collection::Quizzes,
            ..
        })) => QUIZ_NOT_FOUND.into_response(),
        Err(ApiError::Query(QueryError::OutOfBounds { .. })) => {
            QUESTION_OUT_OF_BOUNDS.into_response()
        }
        Err(ApiError::Query(QueryError::NotFound { .. })) => QUESTION_NOT_FOUND.into_response(),
        Err(_) => internal_error(),
    }
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
}
