// Kbedit End-to-End Editing Scenarios
//
// A user imports a configuration, edits it by hand, accepts suggestions
// and pasted snippets, checks it, and exports it again.
//
// Run with: cargo test -p kbedit-core --test e2e_session

use kbedit_core::{
    export_configuration, import_configuration, parse_snippet, validate_karabiner_json,
    Assistant, ChangeKind, EditSession, HeuristicAssistant, ImportOptions, ImportOutcome,
    MemoryStore, NewRule, RuleProblem, Store,
};
use serde_json::json;

// =========================================================================
// Test Helpers
// =========================================================================

fn laptop_document() -> serde_json::Value {
    json!({
        "title": "Laptop",
        "rules": [
            {
                "description": "Caps Lock to Escape",
                "manipulators": [{
                    "type": "basic",
                    "from": {"key_code": "caps_lock", "modifiers": {"optional": ["any"]}},
                    "to": [{"key_code": "escape"}]
                }]
            },
            {
                "description": "Vim arrows",
                "manipulators": [
                    {"type": "basic", "from": {"key_code": "h", "modifiers": {"mandatory": ["control"]}}, "to": [{"key_code": "left_arrow"}]},
                    {"type": "basic", "from": {"key_code": "l", "modifiers": {"mandatory": ["control"]}}, "to": [{"key_code": "right_arrow"}]}
                ]
            }
        ]
    })
}

fn import_laptop(store: &MemoryStore) -> u32 {
    let options = ImportOptions::default();
    match import_configuration(store, "laptop.json", &laptop_document(), false, &options).unwrap() {
        ImportOutcome::Imported { configuration, .. } => configuration.id,
        ImportOutcome::Conflict { .. } => panic!("fresh store cannot conflict"),
    }
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_full_editing_workflow() {
    let store = MemoryStore::new();
    let id = import_laptop(&store);

    let mut session = EditSession::new(&store);
    session.select(id).unwrap();
    assert_eq!(session.rules().unwrap().len(), 3);
    assert!(session.diff().unwrap().is_empty());
    assert!(session.report().unwrap().is_clean());

    // hand-made rule lands after everything imported
    let manual = session
        .create_rule(
            NewRule::new(
                0,
                "Terminal",
                "basic",
                Some(json!({"key_code": "t", "modifiers": {"mandatory": ["command", "option"]}})),
            )
            .with_actions(vec![json!({"shell_command": "open -a Terminal"})]),
        )
        .unwrap();
    assert_eq!(manual.order, 102);

    // the heuristic assistant must not propose what is now bound
    let reply = HeuristicAssistant::new()
        .suggest("open terminal", &session.rules().unwrap())
        .unwrap();
    assert!(!reply.suggestions.is_empty());
    assert!(reply
        .suggestions
        .iter()
        .all(|s| s.combination != "command+option+t"));
    let suggested = session.accept_suggestion(&reply.suggestions[0]).unwrap();

    // suggestion skeletons have no actions until filled in
    let report = session.report().unwrap();
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.rule_id == suggested.id && issue.problem == RuleProblem::NoActions));

    let snippet = parse_snippet(
        r#"{"type": "basic", "from": {"key_code": "f13"}, "to": [{"key_code": "mute"}]}"#,
    )
    .unwrap();
    let pasted = session.accept_groups(&snippet).unwrap();
    assert_eq!(pasted.len(), 1);
    assert_eq!(pasted[0].description, "Chat-generated rule");

    let diff = session.diff().unwrap();
    assert_eq!(diff.original.len(), 3);
    assert_eq!(diff.count(ChangeKind::ManualAdded), 1);
    assert_eq!(diff.count(ChangeKind::AiAdded), 2);

    // export carries every rule, in order
    let doc = export_configuration(&store, id).unwrap();
    let descriptions: Vec<_> = doc.rules.iter().map(|g| g.description.as_str()).collect();
    assert_eq!(descriptions[..3], ["Caps Lock to Escape", "Vim arrows", "Terminal"]);
    assert_eq!(descriptions.last(), Some(&"Chat-generated rule"));

    let text = serde_json::to_string_pretty(&doc).unwrap();
    assert!(validate_karabiner_json(&text).is_ok());
}

#[test]
fn test_reordering_changes_export() {
    let store = MemoryStore::new();
    let id = import_laptop(&store);
    let mut session = EditSession::new(&store);
    session.select(id).unwrap();

    let ids: Vec<_> = session.rules().unwrap().iter().rev().map(|r| r.id).collect();
    session.reorder(&ids).unwrap();
    session.reorder(&ids).unwrap();

    let doc = export_configuration(&store, id).unwrap();
    assert_eq!(doc.rules[0].description, "Vim arrows");
    assert_eq!(
        doc.rules[0].manipulators[0].from,
        Some(json!({"key_code": "l", "modifiers": {"mandatory": ["control"]}}))
    );
    assert_eq!(doc.rules[1].description, "Caps Lock to Escape");
}

#[test]
fn test_conflict_introduced_by_edit() {
    let store = MemoryStore::new();
    let id = import_laptop(&store);
    let mut session = EditSession::new(&store);
    session.select(id).unwrap();

    let clash = session
        .create_rule(
            NewRule::new(
                0,
                "Home",
                "basic",
                Some(json!({"key_code": "h", "modifiers": {"mandatory": ["control"]}})),
            )
            .with_actions(vec![json!({"key_code": "home"})]),
        )
        .unwrap();

    let conflicts = session.conflicts().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].key, "control+h");
    assert_eq!(conflicts[0].count, 2);
    assert!(conflicts[0].rule_ids.contains(&clash.id));

    session.set_enabled(clash.id, false).unwrap();
    assert!(session.conflicts().unwrap().is_empty());
}

#[test]
fn test_snapshot_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = MemoryStore::new();
    let id = import_laptop(&store);
    store.save(&path).unwrap();

    let reloaded = MemoryStore::load(&path).unwrap();
    assert_eq!(
        export_configuration(&reloaded, id).unwrap(),
        export_configuration(&store, id).unwrap()
    );

    // ids keep counting past what was saved
    let before = reloaded.rules_for_configuration(id).unwrap();
    let max_id = before.iter().map(|r| r.id).max().unwrap();
    let added = reloaded
        .create_rule(NewRule::new(id, "x", "basic", Some(json!({"key_code": "x"}))))
        .unwrap();
    assert!(added.id > max_id);
}
