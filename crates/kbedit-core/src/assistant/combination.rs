// Kbedit Combination Parser
// Parses combination strings like "Cmd+Shift+K" into a Karabiner trigger

use std::fmt;

use serde_json::{json, Value};

use crate::analysis::canonical_key;

/// Result of parsing a combination string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCombination {
    /// Karabiner modifier names, in the order given, without duplicates
    pub modifiers: Vec<String>,
    /// The Karabiner key code (the last component)
    pub key_code: String,
}

/// Errors that can occur during combination parsing
#[derive(Debug, Clone, PartialEq)]
pub enum CombinationError {
    /// Empty input string
    EmptyInput,
    /// Input ends with a separator (e.g., "cmd+")
    TrailingSeparator,
    /// Modifier alias not recognized
    UnknownModifier(String),
    /// Key name is not a plausible key code
    InvalidKey(String),
}

impl fmt::Display for CombinationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombinationError::EmptyInput => write!(f, "combination cannot be empty"),
            CombinationError::TrailingSeparator => {
                write!(f, "combination cannot end with a separator")
            }
            CombinationError::UnknownModifier(name) => write!(f, "unknown modifier: '{}'", name),
            CombinationError::InvalidKey(name) => write!(f, "invalid key name: '{}'", name),
        }
    }
}

impl std::error::Error for CombinationError {}

/// Karabiner modifier name for an alias, case-insensitive
pub fn modifier_from_alias(alias: &str) -> Option<&'static str> {
    let name = match alias.to_lowercase().as_str() {
        "command" | "cmd" | "⌘" => "command",
        "option" | "opt" | "alt" | "⌥" => "option",
        "control" | "ctrl" | "ctl" | "⌃" => "control",
        "shift" | "⇧" => "shift",
        "fn" => "fn",
        "caps_lock" => "caps_lock",
        "left_command" | "lcmd" => "left_command",
        "right_command" | "rcmd" => "right_command",
        "left_option" | "lopt" | "lalt" => "left_option",
        "right_option" | "ropt" | "ralt" => "right_option",
        "left_control" | "lctrl" => "left_control",
        "right_control" | "rctrl" => "right_control",
        "left_shift" | "lshift" => "left_shift",
        "right_shift" | "rshift" => "right_shift",
        _ => return None,
    };
    Some(name)
}

/// Karabiner key code for a friendly key name
fn key_code_from_name(name: &str) -> Result<String, CombinationError> {
    let lower = name.to_lowercase();
    let code = match lower.as_str() {
        "esc" => "escape",
        "enter" | "return" => "return_or_enter",
        "space" => "spacebar",
        "backspace" => "delete_or_backspace",
        "del" | "delete" => "delete_forward",
        "left" => "left_arrow",
        "right" => "right_arrow",
        "up" => "up_arrow",
        "down" => "down_arrow",
        "capslock" => "caps_lock",
        other => other,
    };

    let plausible = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !plausible {
        return Err(CombinationError::InvalidKey(name.to_string()));
    }
    Ok(code.to_string())
}

/// Parse a combination like "command+shift+k" into modifiers and key.
///
/// Components are separated by `+`; surrounding whitespace is ignored. The
/// last component is the key, every other one must be a modifier alias.
pub fn parse_combination(text: &str) -> Result<ParsedCombination, CombinationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CombinationError::EmptyInput);
    }
    if trimmed.ends_with('+') {
        return Err(CombinationError::TrailingSeparator);
    }

    let parts: Vec<&str> = trimmed.split('+').map(str::trim).collect();
    let Some((key, modifier_parts)) = parts.split_last() else {
        return Err(CombinationError::EmptyInput);
    };
    let key_code = key_code_from_name(key)?;

    let mut modifiers: Vec<String> = Vec::new();
    for part in modifier_parts {
        let modifier = modifier_from_alias(part)
            .ok_or_else(|| CombinationError::UnknownModifier(part.to_string()))?;
        if !modifiers.iter().any(|m| m == modifier) {
            modifiers.push(modifier.to_string());
        }
    }

    Ok(ParsedCombination {
        modifiers,
        key_code,
    })
}

impl ParsedCombination {
    pub fn new(modifiers: &[&str], key_code: impl Into<String>) -> Self {
        Self {
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
            key_code: key_code.into(),
        }
    }

    /// Trigger descriptor with the modifiers as mandatory
    pub fn to_trigger(&self) -> Value {
        if self.modifiers.is_empty() {
            return json!({"key_code": self.key_code});
        }
        json!({
            "key_code": self.key_code,
            "modifiers": {"mandatory": self.modifiers},
        })
    }

    /// Same form the conflict analyzer compares by
    pub fn canonical_key(&self) -> String {
        canonical_key(Some(&self.to_trigger()))
    }
}

impl fmt::Display for ParsedCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_key() {
        let parsed = parse_combination("f13").unwrap();
        assert!(parsed.modifiers.is_empty());
        assert_eq!(parsed.key_code, "f13");
        assert_eq!(parsed.to_trigger(), json!({"key_code": "f13"}));
    }

    #[test]
    fn test_parse_aliases() {
        let parsed = parse_combination("Cmd + Shift + K").unwrap();
        assert_eq!(parsed.modifiers, vec!["command", "shift"]);
        assert_eq!(parsed.key_code, "k");

        let parsed = parse_combination("ctrl+alt+esc").unwrap();
        assert_eq!(parsed.modifiers, vec!["control", "option"]);
        assert_eq!(parsed.key_code, "escape");

        let parsed = parse_combination("⌘+space").unwrap();
        assert_eq!(parsed.to_string(), "command+spacebar");
    }

    #[test]
    fn test_duplicate_modifiers_collapse() {
        let parsed = parse_combination("cmd+command+a").unwrap();
        assert_eq!(parsed.modifiers, vec!["command"]);
    }

    #[test]
    fn test_canonical_key_sorts_modifiers() {
        let parsed = parse_combination("shift+cmd+k").unwrap();
        assert_eq!(parsed.to_string(), "shift+command+k");
        assert_eq!(parsed.canonical_key(), "command+shift+k");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_combination("  "), Err(CombinationError::EmptyInput));
        assert_eq!(parse_combination("cmd+"), Err(CombinationError::TrailingSeparator));
        assert_eq!(
            parse_combination("super+k"),
            Err(CombinationError::UnknownModifier("super".to_string()))
        );
        assert!(matches!(
            parse_combination("cmd+k k"),
            Err(CombinationError::InvalidKey(_))
        ));
        assert_eq!(
            CombinationError::UnknownModifier("x".to_string()).to_string(),
            "unknown modifier: 'x'"
        );
    }
}
