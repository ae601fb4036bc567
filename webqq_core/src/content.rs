//! Rich-text message content.
//!
//! An outbound message body is a JSON array *serialized into a string*:
//! the plain and face elements first, the font descriptor last, e.g.
//!
//! ```text
//! ["hello",["face",14],["font",{"name":"宋体","size":10,"style":[0,0,0],"color":"000000"}]]
//! ```
//!
//! Inbound poll payloads use the same element vocabulary with the font
//! descriptor first.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// One element of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentElement {
    /// A plain text segment.
    Text(String),
    /// A built-in emoticon by id.
    Face(i64),
}

/// Font descriptor attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    pub size: i64,
    /// Bold, italic, underline flags.
    pub style: [i64; 3],
    pub color: String,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "宋体".to_owned(),
            size: 10,
            style: [0, 0, 0],
            color: "000000".to_owned(),
        }
    }
}

/// Serialize elements and a font into the outbound content string.
#[must_use]
pub fn to_content_json(elements: &[ContentElement], font: &Font) -> String {
    let mut items: Vec<Value> = Vec::with_capacity(elements.len() + 1);
    for element in elements {
        items.push(match element {
            ContentElement::Text(text) => Value::String(text.clone()),
            ContentElement::Face(id) => json!(["face", id]),
        });
    }
    items.push(json!(["font", font]));
    Value::Array(items).to_string()
}

/// Parse an inbound `content` array into elements and an optional font.
/// Unrecognized element kinds are skipped.
#[must_use]
pub fn parse_content(value: &Value) -> (Vec<ContentElement>, Option<Font>) {
    let mut elements = Vec::new();
    let mut font = None;
    let Some(items) = value.as_array() else {
        return (elements, font);
    };
    for item in items {
        match item {
            Value::String(text) => elements.push(ContentElement::Text(text.clone())),
            Value::Array(parts) => match (parts.first().and_then(Value::as_str), parts.get(1)) {
                (Some("font"), Some(descriptor)) => {
                    font = serde_json::from_value(descriptor.clone()).ok();
                }
                (Some("face"), Some(id)) => {
                    if let Some(id) = id.as_i64() {
                        elements.push(ContentElement::Face(id));
                    }
                }
                (tag, _) => debug!(?tag, "skipping unrecognized content element"),
            },
            other => debug!(%other, "skipping unrecognized content element"),
        }
    }
    (elements, font)
}

/// Concatenate the plain-text segments of a message body.
#[must_use]
pub fn plain_text(elements: &[ContentElement]) -> String {
    let mut out = String::new();
    for element in elements {
        if let ContentElement::Text(text) = element {
            out.push_str(text);
        }
    }
    out
}
