use crate::models::question::QuestionRecord;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const TRIM_PUNCTUATION: &[char] = &['.', ',', '?', '!', ':', ';', '"', '(', ')', '[', ']', '{', '}'];

/// Answer words at or below this many characters are not checked.
const ANSWER_WORD_MIN_CHARS: usize = 5;
const ANSWER_WORDS_REQUIRED: usize = 3;
const ANSWER_GROUNDED_RATIO: f64 = 0.3;

const SCORER_TOKEN_MIN_CHARS: usize = 4;
const SCORER_MATCH_RATIO: f64 = 0.4;
const SCORER_MATCH_COUNT: usize = 5;

const STOPWORDS: [&str; 19] = [
    "của", "và", "cho", "với", "trong", "trên", "dưới", "được", "là", "có", "the", "and", "for", "with",
    "from", "this", "that", "are", "was",
];

fn numerals() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("static pattern"))
}

fn numeral_set(text: &str) -> HashSet<&str> {
    numerals().find_iter(text).map(|m| m.as_str()).collect()
}

/// Why a question was judged ungrounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HallucinationReason {
    UnknownNumeral(String),
    UngroundedAnswer { matched: usize, checked: usize },
    UnknownChoiceNumeral(String),
}

/// Drops questions whose numerals or answer vocabulary cannot be traced to
/// `source`. Order of the survivors is preserved.
pub fn filter_hallucinations(questions: Vec<QuestionRecord>, source: &str) -> Vec<QuestionRecord> {
    let source_numerals = numeral_set(source);
    let source_lower = source.to_lowercase();
    let before = questions.len();

    let kept: Vec<QuestionRecord> = questions
        .into_iter()
        .filter(|q| match detect_hallucination(q, &source_numerals, &source_lower) {
            Some(reason) => {
                tracing::warn!(
                    question = %crate::utils::text::preview(&q.question, 80),
                    ?reason,
                    "dropping ungrounded question"
                );
                false
            }
            None => true,
        })
        .collect();

    if kept.len() < before {
        tracing::info!(removed = before - kept.len(), kept = kept.len(), "hallucination filter applied");
    }
    kept
}

fn detect_hallucination(
    question: &QuestionRecord,
    source_numerals: &HashSet<&str>,
    source_lower: &str,
) -> Option<HallucinationReason> {
    let stem = format!("{} {}", question.question, question.answer);
    if let Some(n) = numerals()
        .find_iter(&stem)
        .map(|m| m.as_str())
        .find(|n| !source_numerals.contains(n))
    {
        return Some(HallucinationReason::UnknownNumeral(n.to_string()));
    }

    let words: Vec<String> = question
        .answer
        .split_whitespace()
        .filter(|w| w.chars().count() > ANSWER_WORD_MIN_CHARS)
        .map(|w| w.trim_matches(TRIM_PUNCTUATION).to_lowercase())
        .collect();
    if words.len() >= ANSWER_WORDS_REQUIRED {
        let matched = words.iter().filter(|w| source_lower.contains(w.as_str())).count();
        if (matched as f64) / (words.len() as f64) < ANSWER_GROUNDED_RATIO {
            return Some(HallucinationReason::UngroundedAnswer {
                matched,
                checked: words.len(),
            });
        }
    }

    for choice in &question.choices {
        if let Some(n) = numerals()
            .find_iter(choice)
            .map(|m| m.as_str())
            .find(|n| !source_numerals.contains(n))
        {
            return Some(HallucinationReason::UnknownChoiceNumeral(n.to_string()));
        }
    }

    None
}

/// Whether the share of lexically grounded questions reaches `threshold`.
/// Advisory only.
pub fn score_relevance(questions: &[QuestionRecord], source: &str, threshold: f64) -> bool {
    if questions.is_empty() {
        return false;
    }
    let source_lower = source.to_lowercase();
    let relevant = questions
        .iter()
        .filter(|q| is_grounded(q, &source_lower))
        .count();
    let ratio = relevant as f64 / questions.len() as f64;
    tracing::debug!(relevant, total = questions.len(), ratio, "relevance score");
    ratio >= threshold
}

fn is_grounded(question: &QuestionRecord, source_lower: &str) -> bool {
    let combined = format!(
        "{} {} {}",
        question.question,
        question.answer,
        question.choices.join(" ")
    )
    .to_lowercase();

    let keywords: Vec<&str> = combined
        .split_whitespace()
        .map(|w| w.trim_matches(TRIM_PUNCTUATION))
        .filter(|w| w.chars().count() >= SCORER_TOKEN_MIN_CHARS && !STOPWORDS.contains(w))
        .collect();
    if keywords.is_empty() {
        return false;
    }

    let matches = keywords.iter().filter(|k| source_lower.contains(*k)).count();
    matches as f64 / keywords.len() as f64 >= SCORER_MATCH_RATIO || matches >= SCORER_MATCH_COUNT
}
