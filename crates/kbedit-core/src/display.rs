// Kbedit Display Formatting
// Human-readable summaries of triggers and actions for rule listings

use serde_json::Value;

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn joined(mods: &[Value], key: &str) -> String {
    let mut parts: Vec<String> = mods.iter().map(scalar_text).collect();
    parts.push(key.to_string());
    parts.join(" + ")
}

/// Summarize a trigger descriptor.
///
/// Absent triggers and `{}` both read as "Hardware Button".
pub fn describe_trigger(from: Option<&Value>) -> String {
    let from = match from {
        None | Some(Value::Null) => return "Hardware Button".to_string(),
        Some(Value::String(code)) => return code.clone(),
        Some(from) => from,
    };

    if from.as_object().is_some_and(|obj| obj.is_empty()) {
        return "Hardware Button".to_string();
    }

    if let Some(members) = from.get("simultaneous").and_then(Value::as_array) {
        let keys: Vec<String> = members
            .iter()
            .map(|member| match member.get("key_code").and_then(Value::as_str) {
                Some(code) => code.to_string(),
                None => member.to_string(),
            })
            .collect();
        return format!("{} (simultaneous)", keys.join(" + "));
    }

    if let Some(key) = from.get("key_code").and_then(Value::as_str) {
        let modifiers = from.get("modifiers");
        let mods = modifiers
            .and_then(|m| m.get("mandatory"))
            .or_else(|| modifiers.and_then(|m| m.get("optional")))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        return joined(mods, key);
    }

    if let Some(code) = from.get("consumer_key_code").and_then(Value::as_str) {
        return code.to_string();
    }

    if let Some(button) = from.get("pointing_button").and_then(Value::as_str) {
        return format!("Mouse: {}", button);
    }

    "Complex Pattern".to_string()
}

/// Summarize a single action descriptor
pub fn describe_action(action: &Value) -> String {
    if let Some(key) = action.get("key_code").and_then(Value::as_str) {
        let mods = action
            .get("modifiers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        return joined(mods, key);
    }
    if let Some(command) = action.get("shell_command").and_then(Value::as_str) {
        return format!("Shell: {}", command);
    }
    if let Some(variable) = action.get("set_variable") {
        let name = variable.get("name").map(scalar_text).unwrap_or_default();
        let value = variable.get("value").map(scalar_text).unwrap_or_default();
        return format!("Set: {}={}", name, value);
    }
    action.to_string()
}

/// Comma-separated summary of an action list
pub fn describe_actions(actions: &[Value]) -> String {
    actions
        .iter()
        .map(describe_action)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Friendly name of a Karabiner key code
pub fn key_display_name(key_code: &str) -> String {
    let name = match key_code {
        "caps_lock" => "Caps Lock",
        "escape" => "Escape",
        "return_or_enter" => "Enter",
        "delete_or_backspace" => "Backspace",
        "left_arrow" => "←",
        "right_arrow" => "→",
        "up_arrow" => "↑",
        "down_arrow" => "↓",
        "volume_up" => "Vol+",
        "volume_down" => "Vol-",
        "mute" => "Mute",
        other => return other.replace('_', " ").to_uppercase(),
    };
    name.to_string()
}

/// Symbol for a modifier name, or the name itself
pub fn modifier_symbol(modifier: &str) -> &str {
    match modifier {
        "command" => "⌘",
        "option" => "⌥",
        "control" => "⌃",
        "shift" => "⇧",
        other => other,
    }
}
