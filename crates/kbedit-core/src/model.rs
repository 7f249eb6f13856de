// Kbedit Data Model
// Configurations and the flat, individually addressable rule records

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::validate::ValidationError;

pub type ConfigurationId = u32;
pub type RuleId = u32;

/// An imported Karabiner configuration.
///
/// `data` holds the last-known nested document verbatim; the editable
/// state lives in the configuration's [`Rule`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: ConfigurationId,
    pub name: String,
    pub data: Value,
}

/// Fields needed to create a [`Configuration`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConfiguration {
    pub name: String,
    pub data: Value,
}

/// Partial update of a configuration. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ConfigurationPatch {
    /// Patch that only renames
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data: None,
        }
    }
}

/// One manipulator of a Karabiner rule-group, flattened into its own record.
///
/// `from_key`, `to_actions` and `conditions` are kept as opaque JSON values:
/// Karabiner's trigger/action/condition grammar keeps growing, so only the
/// few fields the analyzers need are ever read out of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub configuration_id: ConfigurationId,
    /// Also the grouping key when re-nesting into rule-groups
    pub description: String,
    /// Manipulator type (`basic`, ...). Open domain, never an enum.
    #[serde(rename = "type")]
    pub kind: String,
    pub enabled: bool,
    /// `None` means no trigger was given; `Some({})` is a hardware button.
    pub from_key: Option<Value>,
    pub to_actions: Vec<Value>,
    /// The source manipulator had no `to` key at all. Only then does an
    /// empty `to_actions` export without `to`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub to_absent: bool,
    pub conditions: Option<Vec<Value>>,
    pub order: i64,
    /// Manipulator fields outside the flat model (`to_if_alone`, `parameters`, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Rule {
    /// Materialize a stored rule from its creation fields
    pub fn from_new(id: RuleId, new: NewRule) -> Self {
        Self {
            id,
            configuration_id: new.configuration_id,
            description: new.description,
            kind: new.kind,
            enabled: new.enabled,
            from_key: new.from_key,
            to_actions: new.to_actions,
            to_absent: new.to_absent,
            conditions: new.conditions,
            order: new.order,
            extra: new.extra,
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: RulePatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(from_key) = patch.from_key {
            self.from_key = Some(from_key);
        }
        if let Some(to_actions) = patch.to_actions {
            self.to_actions = to_actions;
            self.to_absent = false;
        }
        if let Some(conditions) = patch.conditions {
            self.conditions = conditions;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(extra) = patch.extra {
            self.extra = extra;
        }
    }
}

/// Fields needed to create a [`Rule`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRule {
    pub configuration_id: ConfigurationId,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub from_key: Option<Value>,
    #[serde(default)]
    pub to_actions: Vec<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub to_absent: bool,
    #[serde(default)]
    pub conditions: Option<Vec<Value>>,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl NewRule {
    /// Enabled, unconditional rule with no actions yet
    pub fn new(
        configuration_id: ConfigurationId,
        description: impl Into<String>,
        kind: impl Into<String>,
        from_key: Option<Value>,
    ) -> Self {
        Self {
            configuration_id,
            description: description.into(),
            kind: kind.into(),
            enabled: true,
            from_key,
            to_actions: Vec::new(),
            to_absent: false,
            conditions: None,
            order: 0,
            extra: Map::new(),
        }
    }

    pub fn with_actions(mut self, to_actions: Vec<Value>) -> Self {
        self.to_actions = to_actions;
        self.to_absent = false;
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<Value>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Parse an untyped payload (e.g. from an editor form) into a rule.
    ///
    /// Shape errors such as a non-array `toActions` surface as
    /// [`ValidationError::Malformed`]; semantic checks are left to
    /// [`crate::validate::validate_new_rule`].
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        Ok(Self::deserialize(value)?)
    }
}

/// Partial update of a rule. Absent fields are left untouched.
///
/// `conditions` distinguishes "not given" (`None`) from "clear them"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub from_key: Option<Value>,
    #[serde(default)]
    pub to_actions: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "double_option")]
    pub conditions: Option<Option<Vec<Value>>>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub extra: Option<Map<String, Value>>,
}

impl RulePatch {
    /// Parse an untyped partial payload
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        Ok(Self::deserialize(value)?)
    }

    /// Patch that only toggles `enabled`
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_rule_from_json_defaults() {
        let rule = NewRule::from_json(&json!({
            "configurationId": 3,
            "description": "Caps to Esc",
            "type": "basic",
            "fromKey": {"key_code": "caps_lock"}
        }))
        .unwrap();

        assert_eq!(rule.configuration_id, 3);
        assert!(rule.enabled);
        assert!(rule.to_actions.is_empty());
        assert_eq!(rule.conditions, None);
        assert_eq!(rule.order, 0);
    }

    #[test]
    fn test_new_rule_from_json_rejects_non_array_actions() {
        let err = NewRule::from_json(&json!({
            "configurationId": 1,
            "description": "x",
            "type": "basic",
            "fromKey": {"key_code": "a"},
            "toActions": {"key_code": "b"}
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_new_rule_from_json_requires_description() {
        let err = NewRule::from_json(&json!({
            "configurationId": 1,
            "type": "basic",
            "fromKey": {"key_code": "a"}
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_rule_patch_conditions_can_be_cleared() {
        let patch = RulePatch::from_json(&json!({"conditions": null})).unwrap();
        assert_eq!(patch.conditions, Some(None));

        let patch = RulePatch::from_json(&json!({"enabled": false})).unwrap();
        assert_eq!(patch.conditions, None);
        assert_eq!(patch.enabled, Some(false));
    }

    #[test]
    fn test_rule_apply_patch() {
        let new = NewRule::new(1, "a", "basic", Some(json!({"key_code": "a"})))
            .with_conditions(vec![json!({"type": "frontmost_application_if"})]);
        let mut rule = Rule::from_new(7, new);

        rule.apply(RulePatch {
            description: Some("b".to_string()),
            conditions: Some(None),
            ..RulePatch::default()
        });

        assert_eq!(rule.id, 7);
        assert_eq!(rule.description, "b");
        assert_eq!(rule.kind, "basic");
        assert_eq!(rule.conditions, None);
    }

    #[test]
    fn test_patching_actions_makes_to_explicit() {
        let mut new = NewRule::new(1, "a", "basic", Some(json!({"key_code": "a"})));
        new.to_absent = true;
        let mut rule = Rule::from_new(1, new);

        rule.apply(RulePatch::enabled(false));
        assert!(rule.to_absent);

        rule.apply(RulePatch {
            to_actions: Some(Vec::new()),
            ..RulePatch::default()
        });
        assert!(!rule.to_absent);
    }

    #[test]
    fn test_rule_serializes_camel_case() {
        let rule = Rule::from_new(1, NewRule::new(2, "d", "basic", None));
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["configurationId"], json!(2));
        assert_eq!(value["type"], json!("basic"));
        assert_eq!(value["fromKey"], Value::Null);
        assert!(value.get("extra").is_none());
        assert!(value.get("toAbsent").is_none());
    }
}
