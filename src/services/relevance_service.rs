use crate::error::{Error, Result};
use crate::models::relevance::RelevanceAssessment;
use crate::services::completion_service::{CompletionClient, CompletionRequest};
use crate::utils::text::{char_prefix, strip_code_fences};
use std::sync::Arc;

/// How much of the source text the gate shows the model.
pub const RELEVANCE_PREFIX_CHARS: usize = 500;

const GATE_TEMPERATURE: f32 = 0.3;
const GATE_MAX_TOKENS: u32 = 300;

const GATE_SYSTEM_PROMPT: &str = r#"You assess whether a document can support a user's question-generation request.

Steps:
1. Read the request and extract the topics/subjects it asks questions about.
2. Read the document excerpt and identify the topics it covers.
3. Compare:
   - RELEVANT: the document contains information about the requested topics.
   - NOT RELEVANT: the document is about something else entirely.

Examples:
- Request "10 multiple-choice questions about logarithms", document is a math textbook chapter on logarithmic functions -> relevant=true.
- Request "10 questions about literature", document is a math textbook on logarithms -> relevant=false.
- Request "5 questions on logarithms and 5 on derivatives", document only covers logarithms -> relevant=true, confidence=0.5.

Output ONLY JSON, no other text:
{
  "relevant": true/false,
  "confidence": 0.0-1.0,
  "reason": "short explanation",
  "topics_found": ["topic 1", "topic 2"],
  "topics_missing": ["missing topic"]
}"#;

/// Up-front topical check run once per generation request.
#[derive(Clone)]
pub struct RelevanceGate {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl RelevanceGate {
    pub fn new(client: Arc<dyn CompletionClient>, model: String) -> Self {
        Self { client, model }
    }

    /// Rejects the request when the document is judged unrelated or the
    /// model is not confident enough.
    pub async fn check(&self, text: &str, instruction: &str) -> Result<RelevanceAssessment> {
        let assessment = self.assess(text, instruction).await;

        if !assessment.is_accepted() {
            tracing::warn!(
                reason = %assessment.reason,
                confidence = assessment.confidence,
                "document rejected as unrelated to the request"
            );
            return Err(Error::RelevanceRejection {
                reason: if assessment.reason.is_empty() {
                    "The document does not contain information related to the request".to_string()
                } else {
                    assessment.reason
                },
                topics_found: assessment.topics_found,
                topics_missing: assessment.topics_missing,
            });
        }

        tracing::info!(confidence = assessment.confidence, "document matches the request");
        if !assessment.topics_missing.is_empty() {
            tracing::warn!(topics_missing = ?assessment.topics_missing, "some requested topics are missing");
        }
        Ok(assessment)
    }

    /// Asks the model for an assessment. Never fails: any service or parse
    /// error yields a permissive assessment.
    pub async fn assess(&self, text: &str, instruction: &str) -> RelevanceAssessment {
        let request = CompletionRequest {
            system_instruction: GATE_SYSTEM_PROMPT.to_string(),
            user_message: format!(
                "USER REQUEST:\n{}\n\nDOCUMENT CONTENT (first {} characters):\n{}...\n\nANALYSIS: does this document contain enough information to create questions for the request?",
                instruction,
                RELEVANCE_PREFIX_CHARS,
                char_prefix(text, RELEVANCE_PREFIX_CHARS)
            ),
            model: self.model.clone(),
            temperature: GATE_TEMPERATURE,
            max_tokens: GATE_MAX_TOKENS,
        };

        let outcome = match self.client.complete(request).await {
            Ok(raw) => parse_assessment(&raw),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(assessment) => {
                tracing::debug!(?assessment, "relevance assessment");
                assessment
            }
            Err(e) => {
                tracing::warn!(error = %e, "relevance check unavailable, continuing with generation");
                RelevanceAssessment::fail_open("Relevance could not be determined, generation continues")
            }
        }
    }
}

/// Reads an assessment from a possibly fenced JSON reply.
pub fn parse_assessment(raw: &str) -> Result<RelevanceAssessment> {
    let mut assessment: RelevanceAssessment = serde_json::from_str(strip_code_fences(raw))?;
    if !assessment.confidence.is_finite() {
        assessment.confidence = 0.0;
    }
    assessment.confidence = assessment.confidence.clamp(0.0, 1.0);
    Ok(assessment)
}
