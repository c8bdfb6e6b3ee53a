// src/summarization/sanitize.rs
//
// Pure cleanup of raw model output. Reasoning models wrap their chain of thought
// in `<think>...</think>` and sometimes append an addendum after a `---` rule.

use once_cell::sync::Lazy;
use regex::Regex;

pub const REASONING_CLOSE_TAG: &str = "</think>";

static SEPARATOR_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"-{3,}").ok());

static CODE_FENCE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"```[A-Za-z]*").ok());

/// Keeps only what follows the last reasoning close tag; text without one is returned as-is.
pub fn strip_reasoning_block(raw: &str) -> &str {
    match raw.rfind(REASONING_CLOSE_TAG) {
        Some(pos) => &raw[pos + REASONING_CLOSE_TAG.len()..],
        None => raw,
    }
}

/// Cuts the text at the first run of three or more dashes.
pub fn truncate_at_separator(text: &str) -> &str {
    let found = match &*SEPARATOR_RE {
        Some(re) => re.find(text).map(|m| m.start()),
        None => text.find("---"),
    };
    match found {
        Some(start) => &text[..start],
        None => text,
    }
}

/// Removes markdown code-fence markers (with or without a language tag) and trims.
pub fn strip_code_fences(text: &str) -> String {
    match &*CODE_FENCE_RE {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.replace("```", "").trim().to_string(),
    }
}

/// Theme-summary sanitizer: reasoning strip, then separator truncation, then trim.
pub fn extract_clean_summary(raw: &str) -> String {
    truncate_at_separator(strip_reasoning_block(raw))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_and_separator() {
        assert_eq!(
            extract_clean_summary("some reasoning</think>FINAL ANSWER---ignored tail"),
            "FINAL ANSWER"
        );
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(extract_clean_summary("  plain text  "), "plain text");
    }

    #[test]
    fn test_only_last_reasoning_block_counts() {
        let raw = "<think>first</think>draft answer<think>second</think>\n  Students value the labs.  ";
        assert_eq!(extract_clean_summary(raw), "Students value the labs.");
    }

    #[test]
    fn test_separator_after_reasoning_strip() {
        // A rule inside the reasoning block must not truncate the answer.
        let raw = "<think>plan\n---\nmore plan</think>Clear grading.\n\n-----\n**Note:** based on 4 reviews";
        assert_eq!(extract_clean_summary(raw), "Clear grading.");
    }

    #[test]
    fn test_hyphenated_words_survive() {
        assert_eq!(
            extract_clean_summary("A well-organized, up-to-date course -- mostly."),
            "A well-organized, up-to-date course -- mostly."
        );
    }

    #[test]
    fn test_empty_after_cleanup() {
        assert_eq!(extract_clean_summary("<think>only thinking</think>   "), "");
        assert_eq!(extract_clean_summary("---tail only"), "");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"summary\": \"x\", \"tags\": []}\n```"),
            "{\"summary\": \"x\", \"tags\": []}"
        );
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
