use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::chunk::Chunk;
use crate::models::question::QuestionRecord;
use crate::services::completion_service::{CompletionClient, CompletionRequest};
use crate::services::parser_service::parse_questions;
use crate::services::relevance_service::RelevanceGate;
use crate::utils::text::preview;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Questions requested when the instruction names no number.
pub const DEFAULT_QUESTION_COUNT: u64 = 5;

const GENERATION_SYSTEM_PROMPT: &str =
    "Create MULTIPLE-CHOICE questions with exactly 4 options labelled A, B, C, D. Output a JSON array only.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub questions: Vec<QuestionRecord>,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub relevance_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_concurrency: usize,
}

impl From<&Config> for GenerationSettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.openai_model.clone(),
            relevance_model: config.relevance_model.clone(),
            temperature: config.ai_temperature,
            max_tokens: config.ai_max_tokens,
            max_concurrency: config.ai_max_concurrency,
        }
    }
}

/// What one chunk's generation call contributed.
#[derive(Debug)]
enum ChunkOutcome {
    Questions(Vec<QuestionRecord>),
    /// The service is unusable for every chunk; abort the batch.
    Fatal(Error),
    /// Only this chunk is lost.
    Soft(Error),
}

/// Fans a request out to one completion call per chunk and merges the
/// parsed questions in chunk order.
#[derive(Clone)]
pub struct GenerationService {
    client: Arc<dyn CompletionClient>,
    gate: RelevanceGate,
    settings: GenerationSettings,
}

impl GenerationService {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        let gate = RelevanceGate::new(Arc::clone(&client), settings.relevance_model.clone());
        Self {
            client,
            gate,
            settings,
        }
    }

    pub async fn generate(&self, chunks: &[Chunk], instruction: &str) -> Result<GenerationOutput> {
        let mut logs: Vec<String> = vec![];
        let Some(first) = chunks.first() else {
            return Err(Error::EmptyResult { chunks: 0 });
        };

        let assessment = self.gate.check(&first.content, instruction).await?;
        logs.push(format!(
            "Relevance check passed (confidence {:.2}).",
            assessment.confidence
        ));

        let target = target_question_count(instruction);
        tracing::info!(
            questions_per_chunk = target,
            chunks = chunks.len(),
            instruction = %preview(instruction, 100),
            "dispatching generation calls"
        );
        logs.push(format!(
            "Requesting {} questions from each of {} chunk(s).",
            target,
            chunks.len()
        ));

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut set = JoinSet::new();

        for (position, chunk) in chunks.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let request = self.build_request(&chunk.content, instruction, target);
            let chunk_index = chunk.index;

            set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(permit) => {
                        let outcome = run_chunk(client.as_ref(), request, chunk_index).await;
                        drop(permit);
                        outcome
                    }
                    Err(e) => ChunkOutcome::Soft(Error::Internal(e.to_string())),
                };
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<Vec<QuestionRecord>>> = vec![None; chunks.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((position, ChunkOutcome::Questions(questions))) => {
                    slots[position] = Some(questions);
                }
                Ok((position, ChunkOutcome::Fatal(e))) => {
                    tracing::error!(chunk = position, error = %e, "aborting generation batch");
                    set.abort_all();
                    return Err(e);
                }
                Ok((position, ChunkOutcome::Soft(e))) => {
                    tracing::warn!(chunk = position, error = %e, "chunk contributed no questions");
                    logs.push(format!("Chunk {} skipped: {}", position, e));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "chunk task did not complete");
                    logs.push(format!("A chunk task did not complete: {}", e));
                }
            }
        }

        let questions: Vec<QuestionRecord> = slots.into_iter().flatten().flatten().collect();
        if questions.is_empty() {
            return Err(Error::EmptyResult {
                chunks: chunks.len(),
            });
        }

        logs.push(format!("Collected {} questions.", questions.len()));
        Ok(GenerationOutput { questions, logs })
    }

    fn build_request(&self, chunk: &str, instruction: &str, target: u64) -> CompletionRequest {
        let rule = "=".repeat(80);
        let user_message = format!(
            r#"SOURCE DOCUMENT:
{rule}
{chunk}
{rule}

USER REQUEST: {instruction}

NUMBER OF QUESTIONS: {target}

QUESTION TYPE: MULTIPLE CHOICE (MCQ), 4 OPTIONS A, B, C, D

REQUIRED FORMAT:
{{"question": "...", "type": "mcq", "choices": ["A. ...", "B. ...", "C. ...", "D. ..."], "answer": "A. ..."}}

ONLY MULTIPLE-CHOICE QUESTIONS.

STEPS:
1. READ the document
2. FIND the information relevant to the request
3. WRITE {target} MULTIPLE-CHOICE questions with 4 options A, B, C, D using only facts from the document
4. CHECK the format

If the document holds nothing usable for the request, output {{"error": "reason"}} instead.

OUTPUT - JSON ARRAY ONLY:
[{{"question":"...", "type":"mcq", "choices":["A. ...","B. ...","C. ...","D. ..."], "answer":"A. ..."}}]"#
        );

        CompletionRequest {
            system_instruction: GENERATION_SYSTEM_PROMPT.to_string(),
            user_message,
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

async fn run_chunk(
    client: &dyn CompletionClient,
    request: CompletionRequest,
    chunk_index: usize,
) -> ChunkOutcome {
    let raw = match client.complete(request).await {
        Ok(raw) => raw,
        Err(e) if e.is_fatal() => return ChunkOutcome::Fatal(e),
        Err(e) => return ChunkOutcome::Soft(e),
    };
    tracing::debug!(chunk_index, response = %preview(&raw, 100), "completion received");

    match parse_questions(&raw) {
        Ok(questions) => {
            tracing::info!(chunk_index, count = questions.len(), "questions parsed");
            ChunkOutcome::Questions(questions)
        }
        Err(e) => ChunkOutcome::Soft(e),
    }
}

fn integer_literals() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static pattern"))
}

/// Code point of the digit zero in each Unicode decimal digit block; each
/// block runs zero..=nine.
const DIGIT_ZEROS: &[u32] = &[
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0,
    0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6,
    0x1E140, 0x1E2F0, 0x1E4F0, 0x1E950, 0x1FBF0,
];

fn decimal_value(c: char) -> Option<u64> {
    let cp = u32::from(c);
    DIGIT_ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&cp))
        .map(|&zero| u64::from(cp - zero))
}

/// Value of a run of decimal digits from any script; `None` when a digit is
/// unknown or the value overflows.
fn literal_value(literal: &str) -> Option<u64> {
    literal
        .chars()
        .try_fold(0u64, |acc, c| acc.checked_mul(10)?.checked_add(decimal_value(c)?))
}

/// Sum of every integer written in the instruction, or the default when
/// none is usable.
pub fn target_question_count(instruction: &str) -> u64 {
    let mut found = false;
    let mut total: u64 = 0;
    for m in integer_literals().find_iter(instruction) {
        match literal_value(m.as_str()) {
            Some(n) => {
                found = true;
                total = total.saturating_add(n);
            }
            None => tracing::debug!(literal = m.as_str(), "ignoring unusable number in instruction"),
        }
    }
    if found {
        total
    } else {
        DEFAULT_QUESTION_COUNT
    }
}
