// Kbedit Key Conflict Detection
// Finds enabled rules bound to the same trigger combination

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use crate::model::{Rule, RuleId};

/// A trigger combination bound by more than one enabled rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyConflict {
    pub key: String,
    pub count: usize,
    pub rule_ids: Vec<RuleId>,
}

/// The key a trigger fires on: `key_code`, else `consumer_key_code`
pub fn trigger_key(from: &Value) -> Option<&str> {
    from.get("key_code")
        .and_then(Value::as_str)
        .or_else(|| from.get("consumer_key_code").and_then(Value::as_str))
}

/// Sorted mandatory modifiers of a trigger
pub fn mandatory_modifiers(from: &Value) -> SmallVec<[&str; 4]> {
    let mut modifiers: SmallVec<[&str; 4]> = from
        .pointer("/modifiers/mandatory")
        .and_then(Value::as_array)
        .map(|mods| mods.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    modifiers.sort_unstable();
    modifiers
}

/// Canonical comparison string for a trigger.
///
/// Mandatory modifiers sorted alphabetically, followed by the trigger key,
/// joined with `+`. Order of the modifiers in the source never matters:
/// `{"key_code": "k", "modifiers": {"mandatory": ["shift", "command"]}}`
/// becomes `command+shift+k`.
pub fn canonical_key(from: Option<&Value>) -> String {
    let Some(from) = from else {
        return String::new();
    };

    let mut parts = mandatory_modifiers(from);
    if let Some(key) = trigger_key(from) {
        parts.push(key);
    }
    parts.join("+")
}

/// Canonical key of a rule, or `None` when it is empty: no trigger, or one
/// with neither a key nor mandatory modifiers (simultaneous sets, pointing
/// buttons, hardware buttons). A modifier-only trigger keys on its modifiers.
pub fn rule_key(rule: &Rule) -> Option<String> {
    let key = canonical_key(rule.from_key.as_ref());
    (!key.is_empty()).then_some(key)
}

/// Report every canonical key shared by more than one enabled rule.
///
/// Disabled rules are left out entirely. Conflicts come back in the order
/// their key was first seen.
pub fn find_key_conflicts(rules: &[Rule]) -> Vec<KeyConflict> {
    let mut by_key: IndexMap<String, Vec<RuleId>> = IndexMap::new();

    for rule in rules.iter().filter(|rule| rule.enabled) {
        if let Some(key) = rule_key(rule) {
            by_key.entry(key).or_default().push(rule.id);
        }
    }

    by_key
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(key, rule_ids)| KeyConflict {
            key,
            count: rule_ids.len(),
            rule_ids,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewRule;
    use serde_json::json;

    fn rule(id: RuleId, from: Value) -> Rule {
        Rule::from_new(id, NewRule::new(1, format!("rule {}", id), "basic", Some(from)))
    }

    #[test]
    fn test_canonical_key_sorts_modifiers() {
        let from = json!({"key_code": "k", "modifiers": {"mandatory": ["shift", "command"]}});
        assert_eq!(canonical_key(Some(&from)), "command+shift+k");
    }

    #[test]
    fn test_canonical_key_consumer_fallback() {
        let from = json!({"consumer_key_code": "volume_increment"});
        assert_eq!(canonical_key(Some(&from)), "volume_increment");

        let both = json!({"key_code": "a", "consumer_key_code": "mute"});
        assert_eq!(canonical_key(Some(&both)), "a");
    }

    #[test]
    fn test_canonical_key_ignores_optional_modifiers() {
        let from = json!({"key_code": "h", "modifiers": {"optional": ["any"]}});
        assert_eq!(canonical_key(Some(&from)), "h");
        assert_eq!(canonical_key(None), "");
    }

    #[test]
    fn test_two_plain_keys_conflict() {
        let rules = vec![rule(1, json!({"key_code": "a"})), rule(2, json!({"key_code": "a"}))];
        let conflicts = find_key_conflicts(&rules);
        assert_eq!(
            conflicts,
            vec![KeyConflict {
                key: "a".to_string(),
                count: 2,
                rule_ids: vec![1, 2],
            }]
        );
    }

    #[test]
    fn test_modifier_order_insensitive() {
        let rules = vec![
            rule(1, json!({"key_code": "k", "modifiers": {"mandatory": ["command", "shift"]}})),
            rule(2, json!({"key_code": "k", "modifiers": {"mandatory": ["shift", "command"]}})),
            rule(3, json!({"key_code": "k", "modifiers": {"mandatory": ["command"]}})),
        ];
        let conflicts = find_key_conflicts(&rules);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, "command+shift+k");
        assert_eq!(conflicts[0].count, 2);
    }

    #[test]
    fn test_disabled_rules_excluded() {
        let mut disabled = rule(3, json!({"key_code": "a"}));
        disabled.enabled = false;
        let rules = vec![
            rule(1, json!({"key_code": "a"})),
            disabled,
            rule(2, json!({"key_code": "b"})),
        ];
        assert!(find_key_conflicts(&rules).is_empty());
    }

    #[test]
    fn test_modifier_only_triggers_conflict() {
        let mut rules = vec![
            rule(1, json!({"modifiers": {"mandatory": ["fn"]}})),
            rule(2, json!({"modifiers": {"mandatory": ["fn"]}})),
        ];
        for rule in &mut rules {
            rule.kind = "mouse_motion_to_scroll".to_string();
        }

        let conflicts = find_key_conflicts(&rules);
        assert_eq!(
            conflicts,
            vec![KeyConflict {
                key: "fn".to_string(),
                count: 2,
                rule_ids: vec![1, 2],
            }]
        );
    }

    #[test]
    fn test_empty_keys_never_conflict() {
        let rules = vec![
            rule(1, json!({})),
            rule(2, json!({})),
            rule(3, json!({"simultaneous": [{"key_code": "j"}, {"key_code": "k"}]})),
            rule(4, json!({"simultaneous": [{"key_code": "j"}, {"key_code": "k"}]})),
        ];
        assert!(find_key_conflicts(&rules).is_empty());
    }
}
