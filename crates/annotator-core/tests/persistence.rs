use std::fs;

use annotator_core::{
    AnnotationStore, BoundingBox, ConnectionKind, EdgeRef, SaveOutcome,
};
use serde_json::{json, Value};

fn sample_store() -> AnnotationStore {
    let mut store = AnnotationStore::new();
    store
        .add_component("A", BoundingBox::new(0.0, 0.0, 10.0, 10.0))
        .unwrap();
    store
        .add_component("B", BoundingBox::new(20.0, 0.0, 30.0, 10.0))
        .unwrap();
    store
        .add_component("电源", BoundingBox::new(40.0, 0.0, 50.0, 10.0))
        .unwrap();
    store.add_connection("A", "B", ConnectionKind::Output);
    store.add_connection("A", "B", ConnectionKind::Output);
    store.add_connection("B", "电源", ConnectionKind::Inout);
    store
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diagram.json");
    let store = sample_store();

    assert_eq!(store.save_to_path(&path).unwrap(), SaveOutcome::Written);

    let mut loaded = AnnotationStore::new();
    assert!(loaded.load_from_path(&path));
    assert_eq!(loaded, store);
}

#[test]
fn saved_file_is_pretty_ordered_and_unescaped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diagram.json");
    sample_store().save_to_path(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("电源"));
    assert!(!text.contains("\\u"));
    assert!(text.starts_with("{\n  \"A\": {\n    \"component_box\": ["));

    let value: Value = serde_json::from_str(&text).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["A", "B", "电源"]);
    assert_eq!(
        value["A"]["connections"],
        json!({
            "input": [],
            "output": [{"name": "B", "count": 2}],
            "inout": []
        })
    );
    assert_eq!(value["B"]["connections"]["input"], json!([{"name": "A", "count": 1}]));
}

#[test]
fn legacy_files_default_counts_and_keep_extra_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    fs::write(
        &path,
        r#"{
  "Amp": {
    "type": "",
    "component_box": [1.5, 2.0, 30.0, 40.0],
    "connections": {"input": [], "output": [{"name": "Filter"}], "inout": []}
  },
  "Filter": {
    "type": "lowpass",
    "component_box": [50, 2, 80, 40],
    "connections": {"input": [{"name": "Amp"}], "output": [], "inout": []}
  }
}"#,
    )
    .unwrap();

    let mut store = AnnotationStore::new();
    assert!(store.load_from_path(&path));
    assert_eq!(
        store.component("Amp").unwrap().connections.output,
        vec![EdgeRef::single("Filter")]
    );
    assert_eq!(store.component("Filter").unwrap().type_label(), Some("lowpass"));
    assert!(store.is_consistent());

    store.save_to_path(&path).unwrap();
    let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["Filter"]["type"], json!("lowpass"));
    assert_eq!(
        value["Amp"]["connections"]["output"],
        json!([{"name": "Filter", "count": 1}])
    );
}

#[test]
fn skip_marker_excludes_components() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skipped.json");
    let mut store = sample_store();
    store.set_skipped("Contains basic elements");

    store.save_to_path(&path).unwrap();
    let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value, json!({"status": "skipped", "reason": "Contains basic elements"}));

    let mut loaded = sample_store();
    assert!(loaded.load_from_path(&path));
    assert!(loaded.is_empty());
    assert_eq!(loaded.skipped_reason(), Some("Contains basic elements"));
}

#[test]
fn loading_a_component_file_clears_old_skip_reason() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.json");
    sample_store().save_to_path(&path).unwrap();

    let mut store = AnnotationStore::new();
    store.set_skipped("old");
    assert!(store.load_from_path(&path));
    assert_eq!(store.skipped_reason(), None);
    assert_eq!(store.len(), 3);
}

#[test]
fn missing_or_malformed_files_leave_store_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = sample_store();
    assert!(!store.load_from_path(dir.path().join("absent.json")));
    assert!(store.is_empty());

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    let mut store = sample_store();
    assert!(!store.load_from_path(&broken));
    assert!(store.is_empty());

    let list = dir.path().join("list.json");
    fs::write(&list, "[1, 2]").unwrap();
    let mut store = sample_store();
    assert!(!store.load_from_path(&list));
    assert!(store.is_empty());
}

#[test]
fn empty_store_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    let store = AnnotationStore::new();
    assert_eq!(store.save_to_path(&path).unwrap(), SaveOutcome::NothingToSave);
    assert!(store.save_to_path_ok(&path));
    assert!(!path.exists());
}

#[test]
fn write_failure_is_reported_and_memory_kept() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "file, not a folder").unwrap();
    let path = blocker.join("diagram.json");

    let store = sample_store();
    assert!(store.save_to_path(&path).is_err());
    assert!(!store.save_to_path_ok(&path));
    assert_eq!(store.len(), 3);
}

#[test]
fn save_creates_missing_folders_and_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("json").join("batch1");
    let path = folder.join("d.json");
    sample_store().save_to_path(&path).unwrap();

    let names: Vec<String> = fs::read_dir(&folder)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["d.json"]);
}

#[test]
fn scenario_two_outputs_one_mirror() {
    let mut store = AnnotationStore::new();
    store
        .add_component("A", BoundingBox::new(0.0, 0.0, 10.0, 10.0))
        .unwrap();
    store
        .add_component("B", BoundingBox::new(20.0, 0.0, 30.0, 10.0))
        .unwrap();
    store.add_connection("A", "B", ConnectionKind::Output);
    store.add_connection("A", "B", ConnectionKind::Output);

    assert_eq!(
        store.component("A").unwrap().connections.output,
        vec![EdgeRef::new("B", 2)]
    );
    assert_eq!(
        store.component("B").unwrap().connections.input,
        vec![EdgeRef::single("A")]
    );
}

#[test]
fn scenario_text_edit_then_delete() {
    let mut store = AnnotationStore::new();
    for (i, name) in ["A", "B", "C"].iter().enumerate() {
        let x = i as f64 * 20.0;
        store
            .add_component(*name, BoundingBox::new(x, 0.0, x + 10.0, 10.0))
            .unwrap();
    }
    store.update_connections_from_text("A", ConnectionKind::Output, "B*3, C");
    assert_eq!(
        store.component("A").unwrap().connections.output,
        vec![EdgeRef::new("B", 3), EdgeRef::single("C")]
    );
    assert_eq!(store.component("B").unwrap().connections.input, vec![EdgeRef::single("A")]);
    assert_eq!(store.component("C").unwrap().connections.input, vec![EdgeRef::single("A")]);

    store.remove_component("B");
    assert!(store.component("B").is_none());
    assert_eq!(
        store.component("A").unwrap().connections.output,
        vec![EdgeRef::single("C")]
    );
}

#[test]
fn odd_component_entries_survive_a_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odd.json");
    fs::write(
        &path,
        r#"{
  "A": {"component_box": [0, 0, 10, 10], "connections": {"input": [], "output": [{"name": "B", "count": 2.0}], "inout": []}},
  "B": {"component_box": [20, 0, 30, 10], "connections": {"input": [{"name": "A", "count": 1}], "output": [], "inout": []}},
  "C": {"component_box": null, "connections": {"input": [], "output": [], "inout": []}},
  "D": {"component_box": [1, 2, 3]}
}"#,
    )
    .unwrap();

    let mut store = AnnotationStore::new();
    assert!(store.load_from_path(&path));
    assert_eq!(store.connection_count("A", "B", ConnectionKind::Output), 2);

    store.save_to_path(&path).unwrap();
    let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["A", "B", "C", "D"]);
    assert_eq!(value["A"]["connections"]["output"], json!([{"name": "B", "count": 2}]));
    assert_eq!(value["A"]["component_box"], json!([0, 0, 10, 10]));
    assert_eq!(value["C"]["component_box"], Value::Null);
    assert_eq!(value["D"]["component_box"], json!([1, 2, 3]));
}

#[test]
fn load_then_save_keeps_integer_boxes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ints.json");
    let original = r#"{
  "Amp": {
    "component_box": [
      50,
      2,
      80.5,
      40
    ],
    "connections": {
      "input": [],
      "output": [],
      "inout": []
    }
  }
}"#;
    fs::write(&path, original).unwrap();

    let mut store = AnnotationStore::new();
    assert!(store.load_from_path(&path));
    store.save_to_path(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}
