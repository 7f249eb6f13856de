// Kbedit Device Usage Analysis
// Which keys each device-scoped rule set already binds

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

use crate::model::Rule;

/// Keys bound by rules conditioned on one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUsage {
    pub vendor_id: u64,
    pub product_id: u64,
    pub used_keys: Vec<String>,
}

impl DeviceUsage {
    /// `vendor-product` identifier
    pub fn device_id(&self) -> String {
        format!("{}-{}", self.vendor_id, self.product_id)
    }

    pub fn uses(&self, key_code: &str) -> bool {
        self.used_keys.iter().any(|k| k == key_code)
    }
}

/// Key codes a trigger mentions, including simultaneous members
pub fn trigger_key_codes(from: &Value) -> Vec<&str> {
    let mut codes = Vec::new();
    if let Some(code) = from.get("key_code").and_then(Value::as_str) {
        codes.push(code);
    }
    if let Some(members) = from.get("simultaneous").and_then(Value::as_array) {
        codes.extend(
            members
                .iter()
                .filter_map(|member| member.get("key_code").and_then(Value::as_str)),
        );
    }
    codes
}

/// Group used key codes by the `device_if` identifiers of each rule's
/// conditions. Devices appear in first-seen order; identifiers without
/// both a vendor and a product id are ignored.
pub fn analyze_devices(rules: &[Rule]) -> Vec<DeviceUsage> {
    let mut devices: IndexMap<(u64, u64), IndexSet<String>> = IndexMap::new();

    for rule in rules {
        let Some(conditions) = &rule.conditions else {
            continue;
        };
        let keys = rule
            .from_key
            .as_ref()
            .map(trigger_key_codes)
            .unwrap_or_default();

        for condition in conditions {
            if condition.get("type").and_then(Value::as_str) != Some("device_if") {
                continue;
            }
            let Some(identifiers) = condition.get("identifiers").and_then(Value::as_array) else {
                continue;
            };

            for identifier in identifiers {
                let vendor = identifier.get("vendor_id").and_then(Value::as_u64);
                let product = identifier.get("product_id").and_then(Value::as_u64);
                let (Some(vendor), Some(product)) = (vendor, product) else {
                    continue;
                };

                let used = devices.entry((vendor, product)).or_default();
                used.extend(keys.iter().map(|k| k.to_string()));
            }
        }
    }

    devices
        .into_iter()
        .map(|((vendor_id, product_id), used)| DeviceUsage {
            vendor_id,
            product_id,
            used_keys: used.into_iter().collect(),
        })
        .collect()
}
