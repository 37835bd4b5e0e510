pub mod health;
pub mod questions;

use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    dto::question_dto::{
        CountResponse, GenerateQuestionsPayload, IndexedQuestionResponse, QuestionListResponse,
    },
    models::question::{Difficulty, QuestionRecord, QuestionType},
    services::quiz_service::GenerationReport,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        questions::generate_questions,
        questions::list_questions,
        questions::search_questions,
        questions::count_questions,
        questions::add_question,
        questions::get_question,
        questions::update_question,
        questions::delete_question,
        questions::clear_questions,
    ),
    components(schemas(
        GenerateQuestionsPayload,
        GenerationReport,
        QuestionRecord,
        QuestionType,
        Difficulty,
        QuestionListResponse,
        IndexedQuestionResponse,
        CountResponse,
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Every route, with state applied. Middleware layers are added by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/questions/generate", post(questions::generate_questions))
        .route(
            "/api/sessions/:session_id/questions",
            get(questions::list_questions)
                .post(questions::add_question)
                .delete(questions::clear_questions),
        )
        .route(
            "/api/sessions/:session_id/questions/search",
            get(questions::search_questions),
        )
        .route(
            "/api/sessions/:session_id/questions/count",
            get(questions::count_questions),
        )
        .route(
            "/api/sessions/:session_id/questions/:index",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .with_state(state)
}
