use crate::error::{Error, Result};
use crate::models::question::{Difficulty, QuestionRecord, QuestionType, CHOICE_COUNT, CHOICE_LETTERS};
use crate::utils::text::{preview, strip_code_fences};
use serde_json::{Map, Value as JsonValue};

/// Answer stored when the model left it out.
pub const MISSING_ANSWER: &str = "Not provided";

/// Placeholder options. Kept free of digits so the numeral grounding check
/// never trips on them.
const DISTRACTORS: [&str; CHOICE_COUNT - 1] = ["Other answer", "Another answer", "A different answer"];

pub type RawQuestion = Map<String, JsonValue>;

/// Result of pulling a question array out of raw model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Vec<RawQuestion>),
    /// The model deliberately produced nothing for this input.
    Empty,
    Failure(String),
}

/// Parses and repairs a model response into question records.
pub fn parse_questions(raw: &str) -> Result<Vec<QuestionRecord>> {
    match extract_questions(raw) {
        ParseOutcome::Parsed(items) => {
            let mut repaired = 0;
            let records: Vec<QuestionRecord> = items
                .into_iter()
                .map(|item| {
                    let (record, changed) = repair(item);
                    if changed {
                        repaired += 1;
                    }
                    record
                })
                .collect();
            if repaired > 0 {
                tracing::warn!(repaired, total = records.len(), "repaired question type/choices");
            }
            Ok(records)
        }
        ParseOutcome::Empty => Ok(Vec::new()),
        ParseOutcome::Failure(reason) => Err(Error::ParseFailure(reason)),
    }
}

/// Locates the question array in `raw`, tolerating code fences and prose
/// around it. Elements without a `question` field are dropped unless that
/// would drop everything, in which case every element is coerced instead.
pub fn extract_questions(raw: &str) -> ParseOutcome {
    let content = strip_code_fences(raw);
    if content.is_empty() {
        return ParseOutcome::Failure("empty response".to_string());
    }

    if content.starts_with('{') && content.contains("\"error\"") {
        if let Ok(JsonValue::Object(obj)) = serde_json::from_str::<JsonValue>(content) {
            if let Some(reason) = obj.get("error") {
                tracing::warn!(reason = %reason, "model declined to generate questions for this chunk");
                return ParseOutcome::Empty;
            }
        }
    }

    let (Some(open), Some(close)) = (content.find('['), content.rfind(']')) else {
        tracing::warn!("response contains no JSON array");
        return ParseOutcome::Empty;
    };
    if close < open {
        return ParseOutcome::Failure("unbalanced array brackets".to_string());
    }

    let candidate = &content[open..=close];
    let items = match serde_json::from_str::<JsonValue>(candidate) {
        Ok(JsonValue::Array(items)) => items,
        Ok(_) => return ParseOutcome::Failure("response is not a JSON array".to_string()),
        Err(e) => {
            tracing::error!(error = %e, content = %preview(candidate, 200), "invalid JSON in model response");
            return ParseOutcome::Failure(format!("invalid JSON in model response: {}", e));
        }
    };

    if items.is_empty() {
        return ParseOutcome::Failure("model returned an empty question array".to_string());
    }

    let mut kept = Vec::with_capacity(items.len());
    for item in &items {
        match item {
            JsonValue::Object(map) if map.contains_key("question") => {
                let mut map = map.clone();
                map.entry("answer")
                    .or_insert_with(|| JsonValue::String(MISSING_ANSWER.to_string()));
                kept.push(map);
            }
            other => {
                tracing::warn!(element = %preview(&other.to_string(), 120), "dropping element without a question field");
            }
        }
    }

    if kept.is_empty() {
        tracing::warn!(
            count = items.len(),
            "no element had a question field, recovering leniently"
        );
        kept = items.into_iter().map(coerce_minimal).collect();
    }

    ParseOutcome::Parsed(kept)
}

fn coerce_minimal(item: JsonValue) -> RawQuestion {
    let mut map = match item {
        JsonValue::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("question".to_string(), JsonValue::String(value_text(&other)));
            map
        }
    };
    if !map.contains_key("question") {
        let text = JsonValue::Object(map.clone()).to_string();
        map.insert("question".to_string(), JsonValue::String(text));
    }
    map.entry("answer")
        .or_insert_with(|| JsonValue::String(MISSING_ANSWER.to_string()));
    map
}

/// Forces a raw element into the stored MCQ shape: type `mcq`, exactly four
/// lettered choices, a non-empty answer.
pub fn repair_question(raw: RawQuestion) -> QuestionRecord {
    repair(raw).0
}

fn repair(raw: RawQuestion) -> (QuestionRecord, bool) {
    let mut changed = false;

    let declared_type = raw.get("type").map(value_text).unwrap_or_default();
    if declared_type != QuestionType::Mcq.as_str() {
        changed = true;
    }

    let question = raw.get("question").map(value_text).unwrap_or_default();
    let mut answer = raw
        .get("answer")
        .map(value_text)
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| MISSING_ANSWER.to_string());

    let mut choices: Vec<String> = raw
        .get("choices")
        .and_then(|c| c.as_array())
        .map(|a| a.iter().map(value_text).collect())
        .unwrap_or_default();

    if choices.len() > CHOICE_COUNT {
        choices.truncate(CHOICE_COUNT);
        changed = true;
        if !choices.iter().any(|c| same_option(c, &answer)) {
            choices.clear();
        }
    }
    if choices.len() < CHOICE_COUNT {
        let (synthesized, correct) = synthesize_choices(&answer);
        choices = synthesized;
        answer = correct;
        changed = true;
    }

    let explanation = raw
        .get("explanation")
        .map(value_text)
        .filter(|e| !e.trim().is_empty());
    let difficulty = raw
        .get("difficulty")
        .and_then(|d| d.as_str())
        .and_then(Difficulty::parse);
    let tags = raw.get("tags").and_then(collect_tags);

    let record = QuestionRecord {
        question,
        question_type: QuestionType::Mcq,
        choices,
        answer,
        explanation,
        difficulty,
        tags,
    };
    (record, changed)
}

/// Four options built around the answer: the answer becomes option A,
/// placeholders fill B to D.
fn synthesize_choices(answer: &str) -> (Vec<String>, String) {
    let text = strip_letter_prefix(answer);
    let correct = format!("{}. {}", CHOICE_LETTERS[0], text);

    let mut choices = Vec::with_capacity(CHOICE_COUNT);
    choices.push(correct.clone());
    for (letter, distractor) in CHOICE_LETTERS[1..].iter().zip(DISTRACTORS) {
        choices.push(format!("{}. {}", letter, distractor));
    }
    (choices, correct)
}

fn strip_letter_prefix(text: &str) -> String {
    let mut rest = text.trim();
    for prefix in ["A. ", "B. ", "C. ", "D. "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped.trim_start();
        }
    }
    rest.trim().to_string()
}

fn same_option(choice: &str, answer: &str) -> bool {
    choice.trim() == answer.trim() || strip_letter_prefix(choice) == strip_letter_prefix(answer)
}

fn collect_tags(value: &JsonValue) -> Option<Vec<String>> {
    let raw: Vec<String> = match value {
        JsonValue::Array(items) => items.iter().map(value_text).collect(),
        JsonValue::String(s) => vec![s.clone()],
        _ => return None,
    };
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw.into_iter().map(|t| t.trim().to_string()) {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    (!tags.is_empty()).then_some(tags)
}

fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_array_is_repaired_to_four_choices() {
        let raw = "```json\n[{\"question\":\"Q1\",\"choices\":[\"A. 1\",\"B. 2\"],\"answer\":\"A. 1\"}]\n```";
        let records = parse_questions(raw).unwrap();
        assert_eq!(records.len(), 1);
        let q = &records[0];
        assert_eq!(q.question_type, QuestionType::Mcq);
        assert_eq!(q.choices.len(), 4);
        assert_eq!(q.choices[0], "A. 1");
        assert_eq!(q.answer, "A. 1");
        assert_eq!(q.choices[3], "D. A different answer");
    }

    #[test]
    fn error_object_means_no_questions() {
        let raw = r#"{"error": "chunk contains only a table of contents"}"#;
        assert_eq!(extract_questions(raw), ParseOutcome::Empty);
        assert!(parse_questions(raw).unwrap().is_empty());
    }

    #[test]
    fn text_without_array_is_empty() {
        assert_eq!(extract_questions("Sorry, I cannot help."), ParseOutcome::Empty);
    }

    #[test]
    fn broken_json_is_a_failure() {
        let outcome = extract_questions(r#"[{"question": "Q1", "answer": }]"#);
        assert!(matches!(outcome, ParseOutcome::Failure(_)));
        assert!(matches!(
            parse_questions(r#"[{"question": "Q1",]"#),
            Err(Error::ParseFailure(_))
        ));
    }

    #[test]
    fn empty_array_is_a_failure() {
        assert!(matches!(extract_questions("[]"), ParseOutcome::Failure(_)));
        assert!(matches!(extract_questions("   "), ParseOutcome::Failure(_)));
    }

    #[test]
    fn array_is_found_inside_prose() {
        let raw = r#"Here you go: [{"question": "What is Rust?", "type": "mcq", "choices": ["A. A language", "B. A metal", "C. A color", "D. A game"], "answer": "A. A language"}] Hope it helps!"#;
        let records = parse_questions(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].choices[1], "B. A metal");
        assert_eq!(records[0].answer, "A. A language");
    }

    #[test]
    fn elements_without_question_are_dropped() {
        let raw = r#"[{"question": "Kept?"}, {"prompt": "dropped"}, 42]"#;
        let ParseOutcome::Parsed(items) = extract_questions(raw) else {
            panic!("expected parsed outcome");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["answer"], JsonValue::String(MISSING_ANSWER.to_string()));
    }

    #[test]
    fn lenient_recovery_when_nothing_has_a_question() {
        let raw = r#"[{"q": "Capital of France?"}, "plain text item"]"#;
        let records = parse_questions(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].question.contains("Capital of France?"));
        assert_eq!(records[1].question, "plain text item");
        assert_eq!(records[1].answer, format!("A. {}", MISSING_ANSWER));
        assert!(records.iter().all(|r| r.choices.len() == 4));
    }

    #[test]
    fn letter_prefix_is_moved_to_option_a() {
        let mut raw = RawQuestion::new();
        raw.insert("question".into(), JsonValue::from("Capital of France?"));
        raw.insert("type".into(), JsonValue::from("short_answer"));
        raw.insert("answer".into(), JsonValue::from("B. Paris"));
        let record = repair_question(raw);
        assert_eq!(record.question_type, QuestionType::Mcq);
        assert_eq!(
            record.choices,
            vec!["A. Paris", "B. Other answer", "C. Another answer", "D. A different answer"]
        );
        assert_eq!(record.answer, "A. Paris");
    }

    #[test]
    fn extra_choices_are_truncated_when_answer_survives() {
        let raw = r#"[{"question": "Pick", "choices": ["A. x", "B. y", "C. z", "D. w", "E. v"], "answer": "C. z"}]"#;
        let records = parse_questions(raw).unwrap();
        assert_eq!(records[0].choices, vec!["A. x", "B. y", "C. z", "D. w"]);
        assert_eq!(records[0].answer, "C. z");
    }

    #[test]
    fn extra_choices_are_rebuilt_when_answer_is_cut() {
        let raw = r#"[{"question": "Pick", "choices": ["A. x", "B. y", "C. z", "D. w", "E. v"], "answer": "v"}]"#;
        let records = parse_questions(raw).unwrap();
        assert_eq!(records[0].choices[0], "A. v");
        assert_eq!(records[0].answer, "A. v");
    }

    #[test]
    fn optional_fields_are_normalized() {
        let raw = r#"[{"question": "Q", "choices": ["A. 1", "B. 2", "C. 3", "D. 4"], "answer": "A. 1",
                      "explanation": "because", "difficulty": "HARD", "tags": ["math", "math", " algebra "]}]"#;
        let record = &parse_questions(raw).unwrap()[0];
        assert_eq!(record.explanation.as_deref(), Some("because"));
        assert_eq!(record.difficulty, Some(Difficulty::Hard));
        assert_eq!(record.tags, Some(vec!["math".to_string(), "algebra".to_string()]));
    }

    #[test]
    fn unknown_difficulty_is_dropped() {
        let raw = r#"[{"question": "Q", "answer": "x", "difficulty": "extreme"}]"#;
        assert_eq!(parse_questions(raw).unwrap()[0].difficulty, None);
    }
}
