// Kbedit Karabiner Document Types
// Nested rule-group / manipulator structures as Karabiner-Elements writes them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fallback manipulator type when a document omits it
pub const DEFAULT_MANIPULATOR_TYPE: &str = "basic";

/// A simplified Karabiner document: a title and its rule-groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KarabinerDocument {
    pub title: String,
    pub rules: Vec<RuleGroup>,
}

/// A named rule-group holding one or more manipulators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub description: String,
    pub manipulators: Vec<Manipulator>,
}

/// A single manipulator.
///
/// Only the fields the editor flattens are named; everything else
/// (`to_if_alone`, `to_after_key_up`, `parameters`, ...) rides along in
/// `extra` so it survives an import/export cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manipulator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RuleGroup {
    pub fn new(description: impl Into<String>, manipulators: Vec<Manipulator>) -> Self {
        Self {
            description: description.into(),
            manipulators,
        }
    }

    /// Read a rule-group from an untyped value.
    ///
    /// A strict parse is tried first. When it fails the group is read field
    /// by field instead: unusable manipulators are skipped and missing
    /// pieces defaulted, each with a warning. Returns `None` only when the
    /// value is not an object at all.
    pub fn from_value(value: &Value) -> Option<Self> {
        match Self::deserialize(value) {
            Ok(group) => return Some(group),
            Err(err) => log::debug!("strict rule-group parse failed, reading leniently: {}", err),
        }

        let Some(obj) = value.as_object() else {
            log::warn!("skipping rule-group that is not an object: {}", value);
            return None;
        };

        let description = match obj.get("description").and_then(Value::as_str) {
            Some(description) => description.to_string(),
            None => {
                log::warn!("rule-group without a description, using an empty one");
                String::new()
            }
        };

        let manipulators = match obj.get("manipulators") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| {
                    let manipulator = Manipulator::from_value(item);
                    if manipulator.is_none() {
                        log::warn!(
                            "rule-group '{}': skipping manipulator that is not an object",
                            description
                        );
                    }
                    manipulator
                })
                .collect(),
            _ => {
                log::warn!("rule-group '{}' has no manipulators array", description);
                Vec::new()
            }
        };

        Some(Self {
            description,
            manipulators,
        })
    }
}

impl Manipulator {
    pub fn new(kind: impl Into<String>, from: Option<Value>, to: Option<Vec<Value>>) -> Self {
        Self {
            description: None,
            kind: kind.into(),
            from,
            to,
            conditions: None,
            extra: Map::new(),
        }
    }

    /// Lenient read of a single manipulator object
    pub fn from_value(value: &Value) -> Option<Self> {
        let mut fields = value.as_object()?.clone();

        let description = match fields.remove("description") {
            Some(Value::String(description)) => Some(description),
            Some(Value::Null) | None => None,
            Some(other) => {
                log::warn!("dropping non-string manipulator description: {}", other);
                None
            }
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            other => {
                log::warn!(
                    "manipulator type {:?} is not a string, defaulting to '{}'",
                    other,
                    DEFAULT_MANIPULATOR_TYPE
                );
                DEFAULT_MANIPULATOR_TYPE.to_string()
            }
        };

        let from = fields.remove("from").filter(|from| !from.is_null());
        let to = read_sequence(&mut fields, "to");
        let conditions = read_sequence(&mut fields, "conditions");

        Some(Self {
            description,
            kind,
            from,
            to,
            conditions,
            extra: fields,
        })
    }
}

// A lone object where an array belongs is wrapped; anything else is dropped.
fn read_sequence(fields: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    match fields.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items),
        Some(object @ Value::Object(_)) => {
            log::warn!("manipulator '{}' is a single object, wrapping it in an array", key);
            Some(vec![object])
        }
        Some(other) => {
            log::warn!("dropping manipulator '{}' that is not an array: {}", key, other);
            None
        }
    }
}

/// Read every usable rule-group out of a raw rules array, in order
pub fn parse_rule_groups(raw: &[Value]) -> Vec<RuleGroup> {
    raw.iter().filter_map(RuleGroup::from_value).collect()
}
