use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::question::QuestionRecord;
use crate::services::chunk_service::chunk_text;
use crate::services::completion_service::CompletionClient;
use crate::services::generation_service::{GenerationService, GenerationSettings};
use crate::services::question_store::QuestionStore;
use crate::services::validation_service::{filter_hallucinations, score_relevance};
use crate::utils::text::clean_text;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationReport {
    pub session_id: String,
    pub questions: Vec<QuestionRecord>,
    pub total: usize,
    pub chunk_count: usize,
    pub generated_count: usize,
    pub hallucinations_removed: usize,
    pub relevance_passed: bool,
    #[schema(value_type = String, format = DateTime)]
    pub generated_at: DateTime<Utc>,
    pub message: String,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_chunk_chars: usize,
    pub chunk_overlap: usize,
    pub relevance_threshold: f64,
    pub min_text_chars: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_chunk_chars: config.max_chunk_chars,
            chunk_overlap: config.chunk_overlap,
            relevance_threshold: config.relevance_threshold,
            min_text_chars: config.min_text_chars,
        }
    }
}

/// Text in, validated questions stored under a session out.
#[derive(Clone)]
pub struct QuizService {
    generation: GenerationService,
    store: Arc<dyn QuestionStore>,
    settings: PipelineSettings,
}

impl QuizService {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn QuestionStore>,
        config: &Config,
    ) -> Self {
        Self {
            generation: GenerationService::new(client, GenerationSettings::from(config)),
            store,
            settings: PipelineSettings::from(config),
        }
    }

    pub async fn generate_from_text(
        &self,
        session_id: &str,
        raw_text: &str,
        instruction: &str,
    ) -> Result<GenerationReport> {
        let text = clean_text(raw_text);
        let chars = text.chars().count();
        if chars < self.settings.min_text_chars {
            return Err(Error::InputTooShort {
                chars,
                min: self.settings.min_text_chars,
            });
        }

        let chunks = chunk_text(&text, self.settings.max_chunk_chars, self.settings.chunk_overlap)?;
        tracing::info!(session_id, chars, chunks = chunks.len(), "starting question generation");

        let mut logs = vec![format!(
            "Split {} characters into {} chunk(s).",
            chars,
            chunks.len()
        )];

        let output = self.generation.generate(&chunks, instruction).await?;
        logs.extend(output.logs);
        let generated_count = output.questions.len();

        let questions = filter_hallucinations(output.questions, &text);
        if questions.is_empty() {
            return Err(Error::AllHallucinated {
                generated: generated_count,
            });
        }
        let hallucinations_removed = generated_count - questions.len();
        if hallucinations_removed > 0 {
            logs.push(format!(
                "Removed {} question(s) not grounded in the document.",
                hallucinations_removed
            ));
        }

        let relevance_passed = score_relevance(&questions, &text, self.settings.relevance_threshold);
        if !relevance_passed {
            tracing::warn!(
                session_id,
                threshold = self.settings.relevance_threshold,
                "ValidationAdvisory: question set is weakly grounded in the document"
            );
            logs.push("Advisory: many questions share little vocabulary with the document.".to_string());
        }

        self.store.set_all(session_id, questions.clone());
        tracing::info!(session_id, total = questions.len(), "questions stored");

        Ok(GenerationReport {
            session_id: session_id.to_string(),
            total: questions.len(),
            message: format!("Generated {} questions.", questions.len()),
            questions,
            chunk_count: chunks.len(),
            generated_count,
            hallucinations_removed,
            relevance_passed,
            generated_at: Utc::now(),
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::completion_service::{CompletionRequest, MockCompletionClient};
    use crate::services::question_store::InMemoryQuestionStore;

    const SOURCE: &str = "The Eiffel Tower was completed in 1889 in Paris. It is 330 metres tall \
and was designed by the engineering company of Gustave Eiffel for the World's Fair.";

    fn config() -> Config {
        Config {
            openai_model: "gen-model".into(),
            relevance_model: "gate-model".into(),
            ..Config::default()
        }
    }

    fn service_replying(generation_reply: &'static str) -> (QuizService, Arc<InMemoryQuestionStore>) {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().returning(move |req: CompletionRequest| {
            if req.model == "gate-model" {
                Ok(r#"{"relevant": true, "confidence": 0.9, "reason": "ok"}"#.to_string())
            } else {
                Ok(generation_reply.to_string())
            }
        });
        let store = Arc::new(InMemoryQuestionStore::new());
        let service = QuizService::new(Arc::new(mock), store.clone(), &config());
        (service, store)
    }

    #[tokio::test]
    async fn grounded_questions_are_stored_under_session() {
        let (service, store) = service_replying(
            r#"[
              {"question": "When was the Eiffel Tower completed?", "type": "mcq",
               "choices": ["A. 1889", "B. 330", "C. 1889", "D. 330"], "answer": "A. 1889"},
              {"question": "When did the Eiffel Tower open to the public?", "type": "mcq",
               "choices": ["A. 1901", "B. 1889", "C. 1850", "D. 1920"], "answer": "A. 1901"}
            ]"#,
        );
        let report = service
            .generate_from_text("s1", SOURCE, "2 questions about the Eiffel Tower")
            .await
            .unwrap();

        assert_eq!(report.generated_count, 2);
        assert_eq!(report.hallucinations_removed, 1);
        assert_eq!(report.total, 1);
        assert_eq!(report.chunk_count, 1);
        assert_eq!(store.get_all("s1"), report.questions);
    }

    #[tokio::test]
    async fn short_input_is_rejected_before_any_call() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().never();
        let service = QuizService::new(Arc::new(mock), Arc::new(InMemoryQuestionStore::new()), &config());
        assert!(matches!(
            service.generate_from_text("s1", "   too short   ", "5 questions").await,
            Err(Error::InputTooShort { chars: 9, min: 50 })
        ));
    }

    #[tokio::test]
    async fn everything_filtered_is_an_error_and_store_untouched() {
        let (service, store) = service_replying(
            r#"[{"question": "Height in 1999?", "type": "mcq",
                 "choices": ["A. 400", "B. 500", "C. 600", "D. 700"], "answer": "A. 400"}]"#,
        );
        let previous = QuestionRecord {
            question: "Where is the Eiffel Tower?".into(),
            question_type: Default::default(),
            choices: vec!["A. Paris".into(), "B. Rome".into(), "C. Oslo".into(), "D. Bern".into()],
            answer: "A. Paris".into(),
            explanation: None,
            difficulty: None,
            tags: None,
        };
        store.set_all("s1", vec![previous.clone()]);
        assert!(matches!(
            service.generate_from_text("s1", SOURCE, "questions").await,
            Err(Error::AllHallucinated { generated: 1 })
        ));
        assert_eq!(store.get_all("s1"), vec![previous]);
    }

    #[tokio::test]
    async fn weak_relevance_is_advisory_only() {
        let (service, _) = service_replying(
            r#"[{"question": "Pick a colour", "type": "mcq",
                 "choices": ["A. crimson", "B. violet", "C. orange", "D. yellow"], "answer": "A. crimson"}]"#,
        );
        let report = service.generate_from_text("s1", SOURCE, "questions").await.unwrap();
        assert!(!report.relevance_passed);
        assert_eq!(report.total, 1);
    }
}
