use serde::{Deserialize, Serialize};

/// Lowest confidence the gate accepts.
pub const MIN_RELEVANCE_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceAssessment {
    #[serde(default)]
    pub relevant: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub topics_found: Vec<String>,
    #[serde(default)]
    pub topics_missing: Vec<String>,
}

impl RelevanceAssessment {
    /// Assessment used when the check itself could not run.
    pub fn fail_open(reason: impl Into<String>) -> Self {
        Self {
            relevant: true,
            confidence: 0.5,
            reason: reason.into(),
            topics_found: Vec::new(),
            topics_missing: Vec::new(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.relevant && self.confidence >= MIN_RELEVANCE_CONFIDENCE
    }
}
