// Kbedit Analysis
// Read-only views over a configuration's rules

pub mod changes;
pub mod conflict;
pub mod devices;

pub use changes::{ChangeKind, ClassifiedRule, RuleDiff, SessionTracker};
pub use conflict::{canonical_key, find_key_conflicts, KeyConflict};
pub use devices::{analyze_devices, DeviceUsage};
