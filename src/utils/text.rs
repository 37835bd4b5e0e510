use regex::Regex;
use std::sync::OnceLock;

fn control_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\t\x0C\x0B]").expect("static pattern"))
}

fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" +").expect("static pattern"))
}

fn blank_line_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static pattern"))
}

/// Normalizes extracted document text: control whitespace becomes spaces,
/// space runs collapse, at most one blank line survives between paragraphs,
/// and every line is trimmed.
pub fn clean_text(raw: &str) -> String {
    let text = control_whitespace().replace_all(raw, " ");
    let text = space_runs().replace_all(&text, " ");
    let text = blank_line_runs().replace_all(&text, "\n\n");

    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Rough token estimate, ~4 characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Removes a leading ```json / ``` fence and a trailing ``` fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut content = raw.trim();
    for marker in ["```json", "```"] {
        if let Some(rest) = content.strip_prefix(marker) {
            content = rest.trim_start();
        }
    }
    if let Some(rest) = content.strip_suffix("```") {
        content = rest.trim_end();
    }
    content
}

/// First `max_chars` characters of `text`.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Shortened single-line preview for log messages.
pub fn preview(text: &str, max_chars: usize) -> String {
    let head = char_prefix(text, max_chars).replace('\n', " ");
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_normalizes_whitespace() {
        let raw = "  Title\t\twith   tabs \r\n\n\n\n  body line  \n";
        assert_eq!(clean_text(raw), "Title with tabs\n\nbody line");
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("[]"), "[]");
    }

    #[test]
    fn prefix_counts_characters_not_bytes() {
        assert_eq!(char_prefix("đáp án", 3), "đáp");
        assert_eq!(char_prefix("abc", 10), "abc");
    }

    #[test]
    fn estimate_tokens_uses_char_count() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }
}
