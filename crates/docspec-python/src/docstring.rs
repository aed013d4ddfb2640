//! Docstring parsing.
//!
//! The Google docstring processor rewrites every docstring into a small JSON
//! document:
//!
//! ```json
//! {"content": ["Summary text.", {"Arguments": [{"param": "x", "desc": "..."}]}]}
//! ```
//!
//! Text parts form the summary. `Arguments` items become the per-parameter
//! description map and `Returns` items the return description. Docstrings that
//! are not in this shape (plain text, or malformed JSON) are used verbatim as
//! the summary.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Section holding per-parameter descriptions.
pub const ARGUMENTS_SECTION: &str = "Arguments";

/// Section holding the return description.
pub const RETURNS_SECTION: &str = "Returns";

/// One titled docstring section, items kept as extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct DocstringSection {
    pub title: String,
    pub items: Vec<serde_json::Value>,
}

/// A docstring split into summary, argument descriptions and return text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocstring {
    pub text: String,
    pub args: BTreeMap<String, String>,
    pub returns: Option<String>,
    pub sections: Vec<DocstringSection>,
}

#[derive(Deserialize)]
struct StructuredDocstring {
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text(String),
    Section(BTreeMap<String, Vec<serde_json::Value>>),
}

impl ParsedDocstring {
    /// Parse raw docstring content. Never fails.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<StructuredDocstring>(raw) {
            Ok(structured) => Self::from_structured(structured),
            Err(_) => ParsedDocstring {
                text: raw.trim().to_string(),
                ..ParsedDocstring::default()
            },
        }
    }

    fn from_structured(structured: StructuredDocstring) -> Self {
        let mut texts = Vec::new();
        let mut sections = Vec::new();
        for part in structured.content {
            match part {
                ContentPart::Text(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        texts.push(text.to_string());
                    }
                }
                ContentPart::Section(map) => {
                    sections.extend(
                        map.into_iter()
                            .map(|(title, items)| DocstringSection { title, items }),
                    );
                }
            }
        }

        let mut args = BTreeMap::new();
        let mut returns = Vec::new();
        for section in &sections {
            match section.title.as_str() {
                ARGUMENTS_SECTION => {
                    for item in &section.items {
                        if let (Some(param), Some(desc)) = (
                            item.get("param").and_then(|v| v.as_str()),
                            item.get("desc").and_then(|v| v.as_str()),
                        ) {
                            args.insert(param.to_string(), desc.to_string());
                        }
                    }
                }
                RETURNS_SECTION => returns.extend(section.items.iter().filter_map(item_text)),
                _ => {}
            }
        }

        ParsedDocstring {
            text: texts.join("\n\n"),
            args,
            returns: if returns.is_empty() {
                None
            } else {
                Some(returns.join("\n"))
            },
            sections,
        }
    }

    /// Whether there is no summary text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Description of parameter `name`, if documented.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}

/// Render one section item: strings verbatim, `{param, desc}` as `param: desc`.
fn item_text(item: &serde_json::Value) -> Option<String> {
    match item {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Object(fields) => {
            let desc = fields.get("desc").and_then(|v| v.as_str())?;
            match fields.get("param").and_then(|v| v.as_str()) {
                Some(param) => Some(format!("{}: {}", param, desc)),
                None => Some(desc.to_string()),
            }
        }
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
