//! Reduction of rich-text nodes to plain text.
//!
//! Long texts in ONLV exports are nested structures of paragraphs, spans and
//! formatting elements. Search and display only need their words, so every
//! consumer goes through a [`PlainText`] reducer.

use serde_json::Value;

/// Key prefix the XML converter gives to attributes.
const ATTRIBUTE_PREFIX: &str = "@_";

/// Reduces an arbitrary rich-text node to a plain string.
pub trait PlainText {
    /// Returns the text content of `node`.
    ///
    /// Must never fail: nodes that carry no text reduce to the empty string.
    fn plain_text(&self, node: &Value) -> String;
}

/// The default reducer.
///
/// - strings are trimmed
/// - lists are reduced element-wise and joined with a space
/// - objects yield their `#text` member when it is non-empty, otherwise their
///   values are reduced and joined with a space; `@_` attributes are skipped
/// - everything else is empty
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonText;

impl PlainText for JsonText {
    fn plain_text(&self, node: &Value) -> String {
        match node {
            Value::String(text) => text.trim().to_string(),
            Value::Array(items) => join(items.iter().map(|item| self.plain_text(item))),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("#text") {
                    let text = text.trim();
                    if !text.is_empty() {
                        return text.to_string();
                    }
                }
                join(
                    map.iter()
                        .filter(|(key, _)| !key.starts_with(ATTRIBUTE_PREFIX))
                        .map(|(_, value)| self.plain_text(value)),
                )
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => String::new(),
        }
    }
}

/// Joins non-empty parts with single spaces.
fn join(parts: impl Iterator<Item = String>) -> String {
    parts
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case(json!("  Fliesen verlegen "), "Fliesen verlegen"; "string is trimmed")]
    #[test_case(json!(["Fliesen", "verlegen"]), "Fliesen verlegen"; "list is joined")]
    #[test_case(json!({ "#text": "Wand", "@_class": "x" }), "Wand"; "text member wins")]
    #[test_case(json!({ "#text": "  ", "span": "Boden" }), "Boden"; "blank text member falls back")]
    #[test_case(json!({ "p": [{ "span": "Fliesen" }, { "span": ["in", "Bad"] }] }), "Fliesen in Bad"; "nested")]
    #[test_case(json!({ "p": { "@_style": "fett", "span": "Beton" } }), "Beton"; "attributes are skipped")]
    #[test_case(json!(12), ""; "number is empty")]
    #[test_case(json!(null), ""; "null is empty")]
    #[test_case(json!(true), ""; "bool is empty")]
    fn reduces_to_plain_text(node: Value, expected: &str) {
        assert_eq!(JsonText.plain_text(&node), expected);
    }

    #[test]
    fn empty_parts_do_not_leave_gaps() {
        let node = json!(["a", "", null, "b"]);
        assert_eq!(JsonText.plain_text(&node), "a b");
    }
}
