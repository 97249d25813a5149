//! Locating JSON objects inside free-form model output.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Reasoning blocks emitted by some instruction-tuned models.
    static ref THINK_BLOCK: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
}

/// Remove `<think>...</think>` blocks from model output.
pub fn strip_think_blocks(text: &str) -> std::borrow::Cow<'_, str> {
    THINK_BLOCK.replace_all(text, "")
}

/// Find the balanced object starting at byte offset `start` (which must be `{`).
///
/// Braces inside string literals are ignored. Returns the end offset
/// (exclusive) of the closing brace, or `None` if the object never closes.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Iterate over top-level balanced `{...}` blocks, left to right.
///
/// Nested objects are returned only as part of their enclosing block. An
/// opening brace that never closes is skipped and the scan resumes after it.
pub fn object_candidates(text: &str) -> ObjectCandidates<'_> {
    ObjectCandidates { text, pos: 0 }
}

pub struct ObjectCandidates<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for ObjectCandidates<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let offset = self.text[self.pos..].find('{')?;
            let start = self.pos + offset;

            match balanced_end(self.text, start) {
                Some(end) => {
                    self.pos = end;
                    return Some(&self.text[start..end]);
                }
                None => self.pos = start + 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_object_with_prose() {
        let text = r#"Here you go: {"a": 1} hope that helps"#;
        let found: Vec<_> = object_candidates(text).collect();
        assert_eq!(found, vec![r#"{"a": 1}"#]);
    }

    #[test]
    fn test_nested_object_returned_whole() {
        let text = r#"{"outer": {"inner": 2}} tail"#;
        let found: Vec<_> = object_candidates(text).collect();
        assert_eq!(found, vec![r#"{"outer": {"inner": 2}}"#]);
    }

    #[test]
    fn test_multiple_objects_in_order() {
        let text = r#"first {"a": 1} then {"b": 2}"#;
        let found: Vec<_> = object_candidates(text).collect();
        assert_eq!(found, vec![r#"{"a": 1}"#, r#"{"b": 2}"#]);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"note": "use } and { freely", "q": "say \"}\""}"#;
        let found: Vec<_> = object_candidates(text).collect();
        assert_eq!(found, vec![text]);
    }

    #[test]
    fn test_unclosed_object_yields_nothing() {
        let text = r#"{"disease": "Flu", "confidence": 80"#;
        assert_eq!(object_candidates(text).count(), 0);
    }

    #[test]
    fn test_unclosed_prefix_is_skipped() {
        let text = r#"{ truncated thought {"a": 1}"#;
        let found: Vec<_> = object_candidates(text).collect();
        assert_eq!(found, vec![r#"{"a": 1}"#]);
    }

    #[test]
    fn test_no_braces() {
        assert_eq!(object_candidates("plain text answer").count(), 0);
    }

    #[test]
    fn test_strip_think_blocks() {
        let text = "<think>maybe {x}</think>{\"a\": 1}";
        assert_eq!(strip_think_blocks(text), "{\"a\": 1}");
    }
}
