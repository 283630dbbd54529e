//! Best-effort repair of JSON embedded in AI-generated text
//!
//! The alert provider returns free text that usually, but not always,
//! contains a JSON block: wrapped in markdown fences, with single-quoted
//! strings, bare object keys, or trailing commas. [`repair_json`] extracts
//! the block and rewrites it into strict JSON.
//!
//! This is inherently a heuristic. The documented failure mode is `None`
//! when no JSON block can be found; callers treat an unparseable result the
//! same as a network failure and fall back to default content. The rewrite
//! passes are character scanners that track string state, so text inside
//! string values is never rewritten.

/// Extracts and repairs the JSON block inside `raw`.
///
/// Returns `None` when the text contains no candidate block at all. The
/// returned string is not guaranteed to parse; callers still need to run it
/// through `serde_json`.
pub fn repair_json(raw: &str) -> Option<String> {
    let block = extract_json_block(raw)?;
    Some(strip_trailing_commas(&normalize_quotes_and_keys(block)))
}

/// Finds the JSON candidate: fenced content if present, otherwise the
/// outermost brace/bracket span.
fn extract_json_block(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find("```") {
        let after = &raw[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        let end = after.find("```")?;
        let block = after[..end].trim();
        if block.is_empty() {
            return None;
        }
        return Some(block);
    }

    let (start, close) = match (raw.find('{'), raw.find('[')) {
        (Some(obj), Some(arr)) if arr < obj => (arr, ']'),
        (Some(obj), _) => (obj, '}'),
        (None, Some(arr)) => (arr, ']'),
        (None, None) => return None,
    };
    let end = raw.rfind(close)?;
    if end < start {
        return None;
    }
    Some(raw[start..=end].trim())
}

/// Converts single-quoted strings to double-quoted and quotes bare object
/// keys, leaving the contents of string values untouched.
fn normalize_quotes_and_keys(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.chars().peekable();
    // Last non-whitespace character emitted; a bare word is only a key when
    // it follows an opening brace or a comma and precedes a colon
    let mut prev = None::<char>;

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                while let Some(s) = chars.next() {
                    out.push(s);
                    if s == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if s == '"' {
                        break;
                    }
                }
                prev = Some('"');
            }
            '\'' => {
                out.push('"');
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => {}
                        },
                        '"' => out.push_str("\\\""),
                        '\'' => break,
                        other => out.push(other),
                    }
                }
                out.push('"');
                prev = Some('"');
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                word.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let mut trailing_ws = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() {
                        trailing_ws.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let is_key =
                    chars.peek() == Some(&':') && matches!(prev, Some('{') | Some(','));
                if is_key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
                out.push_str(&trailing_ws);
                prev = word.chars().last();
            }
            other => {
                out.push(other);
                if !other.is_whitespace() {
                    prev = Some(other);
                }
            }
        }
    }
    out
}

/// Removes commas that directly precede a closing brace or bracket.
///
/// Runs after quote normalization, so every string is double-quoted and can
/// be skipped wholesale.
fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                while let Some(s) = chars.next() {
                    out.push(s);
                    if s == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if s == '"' {
                        break;
                    }
                }
            }
            ',' => {
                let mut ws = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() {
                        ws.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !matches!(chars.peek(), Some(&'}') | Some(&']')) {
                    out.push(',');
                }
                out.push_str(&ws);
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn repaired_value(raw: &str) -> Value {
        let repaired = repair_json(raw).expect("block found");
        serde_json::from_str(&repaired).unwrap_or_else(|e| {
            panic!("repaired text should parse: {e}\ninput: {raw}\nrepaired: {repaired}")
        })
    }

    #[test]
    fn test_fenced_block_with_bare_keys_and_trailing_comma() {
        let raw = "Sure! ```json {title: 'x', val: 1,} ``` ";
        assert_eq!(repaired_value(raw), json!({"title": "x", "val": 1}));
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = "here you go\n```\n{\"a\": 1}\n```";
        assert_eq!(repaired_value(raw), json!({"a": 1}));
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let raw = "Based on the conditions: {advice: 'stay hydrated'} Hope that helps!";
        assert_eq!(repaired_value(raw), json!({"advice": "stay hydrated"}));
    }

    #[test]
    fn test_array_payload() {
        let raw = "```json\n[{title: 'a', severity: 'info'}, {title: 'b', severity: 'warning'},]\n```";
        assert_eq!(
            repaired_value(raw),
            json!([
                {"title": "a", "severity": "info"},
                {"title": "b", "severity": "warning"}
            ])
        );
    }

    #[test]
    fn test_keys_inside_string_values_untouched() {
        // The colon-bearing text lives inside a string and must not be quoted
        let raw = r#"{note: "ratio {a: b}, then: more", val: 2}"#;
        assert_eq!(
            repaired_value(raw),
            json!({"note": "ratio {a: b}, then: more", "val": 2})
        );
    }

    #[test]
    fn test_commas_inside_strings_are_not_trailing_commas() {
        let raw = r#"{"note": "one, two,]", "val": 3,}"#;
        assert_eq!(repaired_value(raw), json!({"note": "one, two,]", "val": 3}));
    }

    #[test]
    fn test_single_quoted_string_with_embedded_double_quote() {
        let raw = r#"{msg: 'say "hi" twice'}"#;
        assert_eq!(repaired_value(raw), json!({"msg": "say \"hi\" twice"}));
    }

    #[test]
    fn test_escaped_single_quote() {
        let raw = r"{msg: 'it\'s fine'}";
        assert_eq!(repaired_value(raw), json!({"msg": "it's fine"}));
    }

    #[test]
    fn test_bare_literals_not_quoted() {
        let raw = "{ok: true, missing: null, count: false}";
        assert_eq!(
            repaired_value(raw),
            json!({"ok": true, "missing": null, "count": false})
        );
    }

    #[test]
    fn test_valid_json_passes_through() {
        let raw = r#"{"title": "x", "nested": {"val": [1, 2]}}"#;
        assert_eq!(
            repaired_value(raw),
            json!({"title": "x", "nested": {"val": [1, 2]}})
        );
    }

    #[test]
    fn test_nested_trailing_commas() {
        let raw = "{items: [1, 2, 3,], meta: {done: true,},}";
        assert_eq!(
            repaired_value(raw),
            json!({"items": [1, 2, 3], "meta": {"done": true}})
        );
    }

    #[test]
    fn test_no_json_block_returns_none() {
        assert!(repair_json("I could not generate alerts right now.").is_none());
        assert!(repair_json("").is_none());
    }

    #[test]
    fn test_empty_fence_returns_none() {
        assert!(repair_json("```json\n\n```").is_none());
    }
}
