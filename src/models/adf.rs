//! Atlassian Document Format (ADF) helpers.
//!
//! Jira REST v3 carries descriptions and comment bodies as ADF trees. The portal only
//! ever writes plain paragraphs and reads back plain text.

use serde_json::{json, Value};

/// Footer appended to comments posted by the service account for a signed-in user.
pub const ON_BEHALF_NOTE: &str = "Comment made on behalf of requestor";

/// Wrap plain text into a single-paragraph document. Line breaks become `hardBreak` nodes.
pub fn text_doc(text: &str) -> Value {
    doc(text_nodes(text))
}

/// Comment document: the text, a blank line, and the emphasised on-behalf footer.
pub fn on_behalf_comment(text: &str) -> Value {
    let mut content = text_nodes(text);
    content.push(json!({ "type": "hardBreak" }));
    content.push(json!({ "type": "hardBreak" }));
    content.push(json!({
        "type": "text",
        "text": ON_BEHALF_NOTE,
        "marks": [{ "type": "em" }]
    }));
    doc(content)
}

fn doc(paragraph_content: Vec<Value>) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{ "type": "paragraph", "content": paragraph_content }]
    })
}

fn text_nodes(text: &str) -> Vec<Value> {
    let mut nodes = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            nodes.push(json!({ "type": "hardBreak" }));
        }
        // ADF rejects empty text nodes.
        if !line.is_empty() {
            nodes.push(json!({ "type": "text", "text": line }));
        }
    }
    nodes
}

/// Flatten a description or comment body to plain text.
///
/// Accepts both ADF documents (REST v3) and bare strings (REST v2 / wiki markup).
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        node => {
            let mut out = String::new();
            collect(node, &mut out);
            out.trim_end().to_string()
        }
    }
}

fn collect(node: &Value, out: &mut String) {
    let node_type = node.get("type").and_then(Value::as_str);
    match node_type {
        Some("text") => {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        Some("hardBreak") => out.push('\n'),
        Some("mention") => {
            if let Some(text) = node.pointer("/attrs/text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        Some("listItem") => out.push_str("- "),
        _ => {}
    }

    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect(child, out);
        }
    }

    let is_block = matches!(
        node_type,
        Some("paragraph" | "heading" | "listItem" | "codeBlock" | "blockquote")
    );
    if is_block && !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
