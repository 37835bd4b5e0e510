pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    completion_service::{CompletionClient, OpenAiCompletionClient},
    question_store::{InMemoryQuestionStore, QuestionStore},
    quiz_service::QuizService,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub store: Arc<dyn QuestionStore>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let client = OpenAiCompletionClient::from_config(config, http_client);
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// State over any completion backend, with a fresh in-memory store.
    pub fn with_client(config: &Config, client: Arc<dyn CompletionClient>) -> Self {
        let store: Arc<dyn QuestionStore> = Arc::new(InMemoryQuestionStore::new());
        let quiz_service = QuizService::new(client, Arc::clone(&store), config);
        Self {
            quiz_service,
            store,
        }
    }
}
