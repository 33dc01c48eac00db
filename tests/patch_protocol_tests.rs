/// Patch protocol tests
///
/// Form state -> patch builder -> store -> cache, end to end.
/// Run with: cargo test --test patch_protocol_tests
use coursedesk::client::SaveOutcome;
use coursedesk::storage::catalog::COURSE_PHASE;
use coursedesk::{
    Catalog, Console, DeskConfig, DeskError, DirtyGating, EntityStore, Fields, FormState,
    FormValue, LocalTransport, PatchBuilder, PatchOp, PatchOperation, Value,
};
use std::collections::HashMap;
use std::sync::Arc;

async fn store_with_phase() -> Arc<EntityStore> {
    let store = Arc::new(EntityStore::with_catalog(&Catalog::builtin()));
    store
        .insert(
            COURSE_PHASE,
            Some("p1".into()),
            Fields::from([
                ("name".to_string(), Value::from("Intro Course")),
                ("sequence_order".to_string(), Value::from(1i64)),
                ("start".to_string(), Value::from("2025-04-01")),
                ("end".to_string(), Value::from("2025-04-14")),
            ]),
        )
        .await
        .unwrap();
    store
}

#[test]
fn example_scenario_submits_single_replace() {
    let mut form = FormState::new([("name", "A"), ("tag", "x")]);
    form.set("tag", "y").unwrap();

    let ops = PatchBuilder::default().build(&form);
    assert_eq!(
        serde_json::to_value(&ops).unwrap(),
        serde_json::json!([{ "op": "replace", "path": "/tag", "value": "y" }])
    );
}

#[test]
fn one_replace_per_dirty_field_and_none_for_clean_fields() {
    let keys = ["a", "b", "c", "d", "e"];
    for mask in 0u32..(1 << keys.len()) {
        let mut form = FormState::new(keys.iter().map(|k| (*k, Value::Integer(0))));
        let mut expected = Vec::new();
        for (bit, key) in keys.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                form.set(key, 1i64).unwrap();
                expected.push(format!("/{}", key));
            }
        }

        let ops = PatchBuilder::default().build(&form);
        let paths: Vec<String> = ops.iter().map(|op| op.path.clone()).collect();
        assert_eq!(paths, expected, "mask {:05b}", mask);
        assert!(ops.iter().all(|op| op.op == PatchOp::Replace && op.value == Value::Integer(1)));
    }
}

#[test]
fn small_float_edit_is_still_a_change() {
    let mut form = FormState::new([("weight", 0.0)]);
    form.set("weight", 1e-17).unwrap();

    let ops = PatchBuilder::default().build(&form);
    assert_eq!(ops, vec![PatchOperation::replace("weight", 1e-17)]);

    form.set("weight", 0.0).unwrap();
    assert!(PatchBuilder::default().build(&form).is_empty());
}

#[test]
fn group_fields_flatten_to_top_level_paths() {
    let mut form = FormState::new([
        ("name", FormValue::from("Intro Course")),
        (
            "period",
            FormValue::group([("start", "2025-04-01"), ("end", "2025-04-14")]),
        ),
    ]);
    form.set_group_entry("period", "end", "2025-04-20").unwrap();

    let ops = PatchBuilder::default().build(&form);
    assert_eq!(ops, vec![PatchOperation::replace("end", "2025-04-20")]);

    let values = form.values();
    let flags = HashMap::from([("period".to_string(), true)]);
    let ops = PatchBuilder::default().build_from_flags(&values, &flags);
    let paths: Vec<&str> = ops.iter().map(|op| op.path.as_str()).collect();
    assert_eq!(paths, vec!["/start", "/end"]);
}

#[test]
fn flags_gate_emission_unless_all_fields_requested() {
    let form = FormState::new([("name", "A"), ("tag", "x")]);
    let values = form.values();
    let flags = HashMap::from([("name".to_string(), false), ("tag".to_string(), false)]);

    assert!(PatchBuilder::default().build_from_flags(&values, &flags).is_empty());
    assert_eq!(
        PatchBuilder::new(DirtyGating::AllFields)
            .build_from_flags(&values, &flags)
            .len(),
        2
    );
}

#[tokio::test]
async fn applying_the_same_patch_twice_gives_the_same_entity() {
    let store = store_with_phase().await;
    let ops = vec![
        PatchOperation::replace("name", "Kickoff"),
        PatchOperation::replace("sequence_order", "2"),
    ];

    let once = store.apply_patch(COURSE_PHASE, &"p1".into(), &ops).await.unwrap();
    let twice = store.apply_patch(COURSE_PHASE, &"p1".into(), &ops).await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice.get("sequence_order"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn refetch_after_save_reflects_exactly_the_submitted_fields() {
    let store = store_with_phase().await;
    let before = store.get(COURSE_PHASE, &"p1".into()).await.unwrap();

    let console = Console::new(LocalTransport::new(Arc::clone(&store)), DeskConfig::new());
    let mut editor = console.open_editor(COURSE_PHASE, "p1".into()).await.unwrap();
    editor.form_mut().set("name", "Kickoff").unwrap();

    let outcome = editor.save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));
    assert!(editor.form().is_pristine());

    let after = store.get(COURSE_PHASE, &"p1".into()).await.unwrap();
    for (key, value) in &before.fields {
        if key == "name" {
            assert_eq!(after.get(key), Some(&Value::from("Kickoff")));
        } else {
            assert_eq!(after.get(key), Some(value), "field {} changed", key);
        }
    }

    let cached = console
        .cache()
        .get_entity(COURSE_PHASE, &"p1".into())
        .unwrap()
        .unwrap();
    assert_eq!(cached, after);
}

#[tokio::test]
async fn pristine_editor_sends_nothing() {
    let store = store_with_phase().await;
    let console = Console::new(LocalTransport::new(store), DeskConfig::new());
    let mut editor = console.open_editor(COURSE_PHASE, "p1".into()).await.unwrap();

    assert_eq!(editor.save().await.unwrap(), SaveOutcome::Unchanged);
}

#[tokio::test]
async fn failed_save_keeps_edits_and_leaves_store_untouched() {
    let store = store_with_phase().await;
    let console = Console::new(LocalTransport::new(Arc::clone(&store)), DeskConfig::new());
    let mut editor = console.open_editor(COURSE_PHASE, "p1".into()).await.unwrap();

    editor.form_mut().set("name", "Kickoff").unwrap();
    editor.form_mut().set("sequence_order", "second").unwrap();

    let notification = editor.save_and_notify().await;
    assert!(notification.message.contains("sequence_order"));
    assert_eq!(editor.form().dirty_keys(), vec!["name", "sequence_order"]);

    let stored = store.get(COURSE_PHASE, &"p1".into()).await.unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("Intro Course")));

    editor.cancel();
    assert!(editor.form().is_pristine());
}

#[tokio::test]
async fn all_fields_gating_resends_unchanged_values() {
    let store = store_with_phase().await;
    let config = DeskConfig::new().patch_gating(DirtyGating::AllFields);
    let console = Console::new(LocalTransport::new(Arc::clone(&store)), config);
    let mut editor = console.open_editor(COURSE_PHASE, "p1".into()).await.unwrap();

    let outcome = editor.save().await.unwrap();
    match outcome {
        SaveOutcome::Saved(entity) => {
            assert_eq!(entity, store.get(COURSE_PHASE, &"p1".into()).await.unwrap())
        }
        other => panic!("expected a save, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_entity_is_not_found() {
    let store = store_with_phase().await;
    let err = store
        .apply_patch(COURSE_PHASE, &"missing".into(), &[PatchOperation::replace("name", "x")])
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::NotFound(_)));

    let err = store
        .apply_patch("team", &"p1".into(), &[PatchOperation::replace("name", "x")])
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::NotFound(_)));
}
