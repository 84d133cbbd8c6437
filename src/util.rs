//! Shared utility functions for the taskcanvas crate.

/// Extract a JSON object or array from text that may contain other
/// content (markdown fences, leading prose). Uses bracket-counting to
/// find the outermost value; replies from the hosted LLM are sometimes
/// wrapped despite the JSON-only instruction.
pub fn extract_json_payload(text: &str) -> Option<String> {
    let obj = extract_delimited(text, '{', '}');
    let arr = extract_delimited(text, '[', ']');
    // Prefer whichever starts first, so `[{...}]` is taken as an array.
    match (obj, arr) {
        (Some((os, o)), Some((as_, a))) => Some(if os <= as_ { o } else { a }),
        (Some((_, o)), None) => Some(o),
        (None, Some((_, a))) => Some(a),
        (None, None) => None,
    }
}

fn extract_delimited(text: &str, open: char, close: char) -> Option<(usize, String)> {
    let start = text.find(open)?;
    let mut depth = 0;
    let mut end = start;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + ch.len_utf8();
                    break;
                }
            }
            _ => {}
        }
    }

    if depth == 0 && end > start {
        Some((start, text[start..end].to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_object() {
        let text = r#"{"key": "value"}"#;
        assert_eq!(extract_json_payload(text), Some(text.to_string()));
    }

    #[test]
    fn test_extract_object_with_prefix_and_suffix() {
        let text = r#"Here you go: {"key": "value"} hope that helps"#;
        assert_eq!(
            extract_json_payload(text),
            Some(r#"{"key": "value"}"#.to_string())
        );
    }

    #[test]
    fn test_extract_nested_object() {
        let text = r#"{"outer": {"inner": "value"}}"#;
        assert_eq!(extract_json_payload(text), Some(text.to_string()));
    }

    #[test]
    fn test_extract_array_of_actions() {
        let text = "```json\n[{\"action\": \"list_tasks\"}, {\"action\": \"create_task\", \"title\": \"x\"}]\n```";
        assert_eq!(
            extract_json_payload(text),
            Some(r#"[{"action": "list_tasks"}, {"action": "create_task", "title": "x"}]"#.to_string())
        );
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"{"message": "use {braces} carefully"}"#;
        assert_eq!(extract_json_payload(text), Some(text.to_string()));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(extract_json_payload("No JSON here"), None);
    }

    #[test]
    fn test_unclosed_object() {
        assert_eq!(extract_json_payload(r#"{"key": "value""#), None);
    }
}
