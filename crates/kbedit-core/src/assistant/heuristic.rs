// Kbedit Heuristic Assistant
// Deterministic suggestions of modifier+key combinations no enabled rule binds

use std::collections::HashSet;

use super::{Assistant, AssistantError, AssistantReply, KeySuggestion, ParsedCombination};
use crate::analysis::conflict::rule_key;
use crate::model::Rule;

const DEFAULT_LIMIT: usize = 5;

/// Modifier sets tried per key, most comfortable first
const MODIFIER_SETS: &[&[&str]] = &[
    &["command", "option"],
    &["control", "option"],
    &["command", "shift"],
    &["control", "shift"],
    &["command", "control"],
    &["command", "option", "shift"],
];

const FALLBACK_KEYS: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Proposes at most one free combination per key, trying keys that start
/// words of the request before the rest of the alphabet.
#[derive(Debug, Clone)]
pub struct HeuristicAssistant {
    limit: usize,
}

impl Default for HeuristicAssistant {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

impl HeuristicAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }
}

/// Initials of the message's words, deduplicated, in order
fn mnemonic_keys(message: &str) -> Vec<char> {
    let mut keys = Vec::new();
    for word in message.split(|c: char| !c.is_ascii_alphanumeric()) {
        if word.len() < 3 {
            continue;
        }
        if let Some(first) = word.chars().next().map(|c| c.to_ascii_lowercase()) {
            if !keys.contains(&first) {
                keys.push(first);
            }
        }
    }
    keys
}

impl Assistant for HeuristicAssistant {
    fn suggest(&self, message: &str, rules: &[Rule]) -> Result<AssistantReply, AssistantError> {
        let used: HashSet<String> = rules
            .iter()
            .filter(|rule| rule.enabled)
            .filter_map(rule_key)
            .collect();

        let request = message.trim();
        let description = if request.is_empty() {
            "Custom shortcut".to_string()
        } else {
            request.to_string()
        };

        let mnemonics = mnemonic_keys(request);
        let mut candidates = mnemonics.clone();
        candidates.extend(FALLBACK_KEYS.chars().filter(|c| !mnemonics.contains(c)));

        let mut suggestions = Vec::new();
        for key in candidates {
            if suggestions.len() >= self.limit {
                break;
            }

            let free = MODIFIER_SETS
                .iter()
                .map(|mods| ParsedCombination::new(mods, key.to_string()))
                .find(|combination| !used.contains(&combination.canonical_key()));
            let Some(combination) = free else {
                continue;
            };

            let reasoning = if mnemonics.contains(&key) {
                format!(
                    "'{}' matches your request and {} is not bound by any enabled rule",
                    key.to_ascii_uppercase(),
                    combination
                )
            } else {
                format!("{} is not bound by any enabled rule", combination)
            };
            suggestions.push(KeySuggestion {
                combination: combination.to_string(),
                description: description.clone(),
                reasoning,
            });
        }

        log::debug!(
            "heuristic assistant: {} bound keys, {} suggestions",
            used.len(),
            suggestions.len()
        );

        let text = if suggestions.is_empty() {
            "Every candidate combination is already bound.".to_string()
        } else {
            format!(
                "Found {} unused combination{}.",
                suggestions.len(),
                if suggestions.len() == 1 { "" } else { "s" }
            )
        };

        Ok(AssistantReply { text, suggestions })
    }
}
