// Kbedit Snippet Parser
// Turns pasted JSON (a document, one rule-group, or one manipulator) into rule-groups

use serde_json::Value;

use crate::karabiner::{parse_rule_groups, Manipulator, RuleGroup};

/// Description given to a lone manipulator that carries none
pub const SNIPPET_DESCRIPTION: &str = "Chat-generated rule";

#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("JSON doesn't contain valid Karabiner rules or manipulators")]
    Unrecognized,
}

/// Parse a snippet into rule-groups.
///
/// Accepted shapes, tried in order: an object with a `rules` array, a
/// single rule-group with `manipulators`, or a single `basic` manipulator
/// with both `from` and `to`.
pub fn parse_snippet(text: &str) -> Result<Vec<RuleGroup>, SnippetError> {
    let value: Value = serde_json::from_str(text)?;
    snippet_groups(&value)
}

/// [`parse_snippet`] on an already parsed value
pub fn snippet_groups(value: &Value) -> Result<Vec<RuleGroup>, SnippetError> {
    if let Some(rules) = value.get("rules").and_then(Value::as_array) {
        return Ok(parse_rule_groups(rules));
    }

    if value.get("manipulators").is_some() {
        return RuleGroup::from_value(value)
            .map(|group| vec![group])
            .ok_or(SnippetError::Unrecognized);
    }

    let is_basic = value.get("type").and_then(Value::as_str) == Some("basic");
    if is_basic && value.get("from").is_some() && value.get("to").is_some() {
        let manipulator = Manipulator::from_value(value).ok_or(SnippetError::Unrecognized)?;
        let description = manipulator
            .description
            .clone()
            .unwrap_or_else(|| SNIPPET_DESCRIPTION.to_string());
        return Ok(vec![RuleGroup::new(description, vec![manipulator])]);
    }

    Err(SnippetError::Unrecognized)
}
