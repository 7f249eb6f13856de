// Kbedit Core Library
// Karabiner-Elements configuration editing: import, flat rule storage, analysis, export

pub mod analysis;
pub mod assistant;
pub mod display;
pub mod export;
pub mod import;
pub mod karabiner;
pub mod model;
pub mod normalize;
pub mod session;
pub mod settings;
pub mod snippet;
pub mod store;
pub mod validate;

pub use analysis::{
    analyze_devices, canonical_key, find_key_conflicts, ChangeKind, ClassifiedRule, DeviceUsage,
    KeyConflict, RuleDiff, SessionTracker,
};
pub use assistant::{
    parse_combination, Assistant, AssistantError, AssistantReply, CombinationError,
    HeuristicAssistant, KeySuggestion, ParsedCombination,
};
pub use export::{export_configuration, ExportError};
pub use import::{
    extract_rules, find_duplicate_configuration, import_configuration, ImportError,
    ImportOptions, ImportOutcome, DUPLICATE_SIMILARITY_THRESHOLD,
};
pub use karabiner::{KarabinerDocument, Manipulator, RuleGroup};
pub use model::{
    Configuration, ConfigurationId, ConfigurationPatch, NewConfiguration, NewRule, Rule, RuleId,
    RulePatch,
};
pub use normalize::{groups_to_rules, rules_to_groups, FlatRule, ORDER_SPACING};
pub use session::{EditError, EditSession};
pub use settings::{Settings, SettingsError};
pub use snippet::{parse_snippet, SnippetError};
pub use store::{MemoryStore, Store, StoreError, StoreSnapshot};
pub use validate::{
    validate_karabiner_json, DocumentError, RuleIssue, RuleProblem, ValidationError,
    ValidationReport,
};
