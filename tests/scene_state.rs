use std::path::PathBuf;

use quadtree_server_lib::model::ModelError;
use quadtree_server_lib::{QuadTreeConfig, Rect, SceneItem, SceneModel};


fn state_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("quadtree_server_{}_{name}.json", std::process::id()))
}

fn labelled(label: &str, x: f64, y: f64) -> SceneItem {
    SceneItem { label: Some(label.to_string()), ..SceneItem::new(x, y, 8.0, 8.0) }
}


#[test]
fn save_and_load_keeps_uids_and_items() {
    let path = state_file("roundtrip");
    let file_name = path.to_str().unwrap();

    let scene = SceneModel::new(QuadTreeConfig::with_size(512)).unwrap();
    let uids = scene
        .insert_items(vec![labelled("a", 0.0, 0.0), labelled("b", 100.0, 100.0), labelled("far", 9000.0, -9000.0)])
        .unwrap();
    scene.save_state(file_name).unwrap();

    let restored = SceneModel::new(QuadTreeConfig::with_size(512)).unwrap();
    restored.insert_items(vec![labelled("stale", 1.0, 1.0)]).unwrap();
    assert_eq!(restored.load_state(file_name).unwrap(), 3);

    assert_eq!(restored.items(), scene.items());
    let far = restored.query(&Rect::new(8990.0, -9010.0, 30.0, 30.0));
    assert_eq!(far.len(), 1);
    assert_eq!(far[0].uid, Some(uids[2]));
    assert!(restored.query(&Rect::new(1.0, 1.0, 1.0, 1.0)).iter().all(|item| item.label.as_deref() != Some("stale")));

    std::fs::remove_file(&path).unwrap();
}


#[test]
fn bad_state_file_keeps_current_items() {
    let path = state_file("broken");
    let file_name = path.to_str().unwrap();
    std::fs::write(&path, "{ not a list").unwrap();

    let scene = SceneModel::new(QuadTreeConfig::default()).unwrap();
    scene.insert_items(vec![labelled("keep", 0.0, 0.0)]).unwrap();

    assert!(matches!(scene.load_state(file_name), Err(ModelError::Json(_))));
    assert_eq!(scene.items().len(), 1);

    std::fs::remove_file(&path).unwrap();
}


#[test]
fn rejected_state_file_keeps_current_items() {
    let path = state_file("duplicate");
    let file_name = path.to_str().unwrap();
    let state = r#"[
        {"uid": 5, "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
        {"uid": 5, "x": 10.0, "y": 10.0, "width": 1.0, "height": 1.0}
    ]"#;
    std::fs::write(&path, state).unwrap();

    let scene = SceneModel::new(QuadTreeConfig::default()).unwrap();
    scene.insert_items(vec![labelled("keep", 0.0, 0.0)]).unwrap();

    assert!(matches!(scene.load_state(file_name), Err(ModelError::DuplicateUidInBatch(5))));
    let items = scene.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label.as_deref(), Some("keep"));

    std::fs::remove_file(&path).unwrap();
}


#[test]
fn clear_then_query_is_empty() {
    let scene = SceneModel::new(QuadTreeConfig::default()).unwrap();
    scene.insert_items((0..50).map(|i| labelled("n", i as f64 * 10.0, 0.0)).collect()).unwrap();
    assert_eq!(scene.stats().items, 50);
    assert!(scene.stats().nodes > 1);

    scene.clear_state();
    let stats = scene.stats();
    assert_eq!(stats.items, 0);
    assert_eq!(stats.nodes, 1);
    assert!(scene.query(&stats.extent).is_empty());
}
