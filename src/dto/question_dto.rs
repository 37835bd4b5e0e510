use crate::models::question::{QuestionRecord, QuestionType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenerateQuestionsPayload {
    /// Extracted document text.
    #[validate(length(min = 1))]
    pub text: String,
    /// Free-text instruction, e.g. "10 multiple-choice questions about logarithms".
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    /// Store slot to fill; a new one is allocated when absent.
    #[validate(length(min = 1, max = 128))]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 1))]
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct TypeQuery {
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionListResponse {
    pub session_id: String,
    pub questions: Vec<QuestionRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IndexedQuestionResponse {
    pub index: usize,
    pub question: QuestionRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
    pub session_id: String,
    pub count: usize,
}
