use crate::error::{Error, Result};
use crate::models::chunk::Chunk;
use crate::utils::text::estimate_tokens;

/// Break points tried in priority order when a window has to be cut.
pub const SEPARATORS: [&str; 6] = ["\n\n", ". ", "\u{3002}", "! ", "? ", "\n"];

/// Splits `text` into overlapping windows of at most `max_chars` characters,
/// preferring to cut just after a separator.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if max_chars == 0 {
        return Err(Error::Config("chunk size must be positive".to_string()));
    }
    if overlap >= max_chars {
        return Err(Error::Config(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, max_chars
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= max_chars {
        return Ok(vec![Chunk {
            index: 0,
            start: 0,
            end: total,
            content: text.trim().to_string(),
        }]);
    }

    let separators: Vec<Vec<char>> = SEPARATORS.iter().map(|s| s.chars().collect()).collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + max_chars).min(total);
        if end < total {
            if let Some(cut) = find_break(&chars, start, end, &separators) {
                end = cut;
            }
        }

        let content = chars[start..end].iter().collect::<String>().trim().to_string();
        if !content.is_empty() {
            tracing::debug!(
                chunk_index = chunks.len(),
                chars = end - start,
                tokens = estimate_tokens(&content),
                "chunk cut"
            );
            chunks.push(Chunk {
                index: chunks.len(),
                start,
                end,
                content,
            });
        }

        start = if end < total {
            let next = end.saturating_sub(overlap);
            // a separator close to `start` would otherwise rewind the window
            if next > start {
                next
            } else {
                end
            }
        } else {
            end
        };
    }

    tracing::info!(chunks = chunks.len(), chars = total, "text split into chunks");
    Ok(chunks)
}

/// Position just past the last occurrence of the highest-priority separator
/// found inside `[start, end)`.
fn find_break(chars: &[char], start: usize, end: usize, separators: &[Vec<char>]) -> Option<usize> {
    let window = &chars[start..end];
    separators
        .iter()
        .find_map(|sep| rfind(window, sep).map(|pos| start + pos + sep.len()))
}

fn rfind(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn hard_cutoff_without_separators() {
        let chunks = chunk_text("abcdefghij", 4, 1).unwrap();
        assert_eq!(contents(&chunks), vec!["abcd", "defg", "ghij"]);
        assert_eq!(chunks[1].start, 3);
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn short_text_is_single_trimmed_chunk() {
        let chunks = chunk_text("  short text \n", 100, 10).unwrap();
        assert_eq!(contents(&chunks), vec!["short text"]);
    }

    #[test]
    fn cuts_after_last_sentence_break() {
        let chunks = chunk_text("aaaa. bbbb. cccc", 10, 2).unwrap();
        assert_eq!(contents(&chunks), vec!["aaaa.", ". bbbb.", ". cccc"]);
    }

    #[test]
    fn paragraph_break_outranks_later_sentence_break() {
        let text = "one. two\n\nthree. four five six";
        let chunks = chunk_text(text, 20, 3).unwrap();
        assert_eq!(chunks[0].content, "one. two");
        assert_eq!(chunks.last().unwrap().content, "three. four five six");
    }

    #[test]
    fn full_width_period_is_a_break() {
        let chunks = chunk_text("一二三。四五六。七八九", 5, 1).unwrap();
        assert_eq!(contents(&chunks), vec!["一二三。", "。四五六。", "。七八九"]);
    }

    #[test]
    fn sentence_break_outranks_later_exclamation() {
        let chunks = chunk_text("aa. bb! cc", 9, 0).unwrap();
        assert_eq!(contents(&chunks), vec!["aa.", "bb! cc"]);
    }

    #[test]
    fn question_mark_break_when_alone() {
        let chunks = chunk_text("ab? cd? ef", 8, 0).unwrap();
        assert_eq!(contents(&chunks), vec!["ab? cd?", "ef"]);
    }

    #[test]
    fn early_separator_does_not_stall() {
        let text = "x\n\n".repeat(50);
        let chunks = chunk_text(&text, 10, 9).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks
            .iter()
            .all(|c| c.content.starts_with('x') && c.content.ends_with('x')));
        assert_eq!(chunks.last().unwrap().end, text.chars().count());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        assert!(matches!(chunk_text("abcdef", 4, 4), Err(Error::Config(_))));
        assert!(matches!(chunk_text("abcdef", 0, 0), Err(Error::Config(_))));
    }

    #[test]
    fn covers_every_character_and_respects_bound() {
        let text: String = (0..400)
            .map(|i| match i % 37 {
                0 => ". ".to_string(),
                13 => "\n".to_string(),
                _ => ((b'a' + (i % 26) as u8) as char).to_string(),
            })
            .collect();
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let chunks = chunk_text(&text, 50, 10).unwrap();

        let mut covered = vec![false; total];
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 50);
            for slot in covered.iter_mut().take(chunk.end).skip(chunk.start) {
                *slot = true;
            }
        }
        assert!((0..total).all(|i| covered[i] || chars[i].is_whitespace()));
    }

    #[test]
    fn multibyte_text_splits_on_characters() {
        let text = "Đây là câu hỏi. ".repeat(20);
        let chunks = chunk_text(&text, 40, 5).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 40));
    }

    #[test]
    fn output_is_deterministic() {
        let text = "Alpha beta. Gamma delta! Epsilon? Zeta\neta theta.".repeat(10);
        assert_eq!(chunk_text(&text, 60, 15).unwrap(), chunk_text(&text, 60, 15).unwrap());
    }
}
