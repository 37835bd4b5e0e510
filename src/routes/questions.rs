use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::question_dto::{
        CountResponse, GenerateQuestionsPayload, IndexedQuestionResponse, QuestionListResponse,
        SearchQuery, TypeQuery,
    },
    error::{Error, Result},
    models::question::QuestionRecord,
    services::quiz_service::GenerationReport,
    AppState,
};

fn missing_index(session_id: &str, index: usize) -> Error {
    Error::NotFound(format!("Question {} not found in session {}", index, session_id))
}

#[utoipa::path(
    post,
    path = "/api/questions/generate",
    request_body = GenerateQuestionsPayload,
    responses(
        (status = 200, description = "Questions generated and stored", body = GenerationReport),
        (status = 400, description = "Input too short, unrelated to the request, or nothing usable generated"),
        (status = 401, description = "Completion service rejected the API key"),
        (status = 429, description = "Completion service quota exceeded")
    )
)]
#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let session_id = payload
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let report = state
        .quiz_service
        .generate_from_text(&session_id, &payload.text, &payload.prompt)
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/questions",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        ("type" = Option<String>, Query, description = "Only questions of this type")
    ),
    responses((status = 200, description = "Stored questions", body = QuestionListResponse))
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<TypeQuery>,
) -> Result<impl IntoResponse> {
    let questions = match query.question_type {
        Some(question_type) => state.store.filter_by_type(&session_id, question_type),
        None => state.store.get_all(&session_id),
    };
    Ok(Json(QuestionListResponse {
        count: questions.len(),
        session_id,
        questions,
    }))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/questions/search",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        ("keyword" = String, Query, description = "Case-insensitive text to look for")
    ),
    responses(
        (status = 200, description = "Matching questions", body = QuestionListResponse),
        (status = 400, description = "Empty keyword")
    )
)]
#[axum::debug_handler]
pub async fn search_questions(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    query.validate()?;
    let questions = state.store.search(&session_id, &query.keyword);
    Ok(Json(QuestionListResponse {
        count: questions.len(),
        session_id,
        questions,
    }))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/questions/count",
    params(("session_id" = String, Path, description = "Session ID")),
    responses((status = 200, description = "Number of stored questions", body = CountResponse))
)]
#[axum::debug_handler]
pub async fn count_questions(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse> {
    let count = state.store.count(&session_id);
    Ok(Json(CountResponse { session_id, count }))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/questions",
    params(("session_id" = String, Path, description = "Session ID")),
    request_body = QuestionRecord,
    responses(
        (status = 201, description = "Question appended", body = IndexedQuestionResponse),
        (status = 400, description = "Invalid question")
    )
)]
#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<QuestionRecord>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let index = state.store.add(&session_id, payload.clone());
    Ok((
        StatusCode::CREATED,
        Json(IndexedQuestionResponse {
            index,
            question: payload,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/questions/{index}",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        ("index" = usize, Path, description = "Zero-based question position")
    ),
    responses(
        (status = 200, description = "Question found", body = IndexedQuestionResponse),
        (status = 404, description = "Index out of range")
    )
)]
#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse> {
    let question = state
        .store
        .get(&session_id, index)
        .ok_or_else(|| missing_index(&session_id, index))?;
    Ok(Json(IndexedQuestionResponse { index, question }))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{session_id}/questions/{index}",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        ("index" = usize, Path, description = "Zero-based question position")
    ),
    request_body = QuestionRecord,
    responses(
        (status = 200, description = "Question replaced", body = IndexedQuestionResponse),
        (status = 400, description = "Invalid question"),
        (status = 404, description = "Index out of range")
    )
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
    Json(payload): Json<QuestionRecord>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if !state.store.update(&session_id, index, payload.clone()) {
        return Err(missing_index(&session_id, index));
    }
    Ok(Json(IndexedQuestionResponse {
        index,
        question: payload,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{session_id}/questions/{index}",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        ("index" = usize, Path, description = "Zero-based question position")
    ),
    responses(
        (status = 204, description = "Question removed"),
        (status = 404, description = "Index out of range")
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse> {
    if !state.store.delete(&session_id, index) {
        return Err(missing_index(&session_id, index));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{session_id}/questions",
    params(("session_id" = String, Path, description = "Session ID")),
    responses((status = 204, description = "Session emptied"))
)]
#[axum::debug_handler]
pub async fn clear_questions(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.clear(&session_id);
    Ok(StatusCode::NO_CONTENT)
}
