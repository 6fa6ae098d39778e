use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};

use image::RgbImage;
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::{render_overlay, ModelError};
use crate::quadtree::{Bounded, QuadTree, QuadTreeConfig, QuadTreeError, Rect, Uid};


/// Record stored in the scene index.
/// `uid` is optional on input, every item handed out by the model carries one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneItem {
    #[serde(default)]
    pub uid: Option<Uid>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub label: Option<String>,
}

impl SceneItem {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        SceneItem { uid: None, x, y, width, height, label: None }
    }

    fn with_uid(&self, uid: Uid) -> Self {
        SceneItem { uid: Some(uid), ..self.clone() }
    }
}

impl Bounded for SceneItem {
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn uid(&self) -> Option<Uid> {
        self.uid
    }
}


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub extent: Rect,
    pub depth: usize,
    pub nodes: usize,
    pub items: usize,
}


/// Shared scene index. The tree itself has no locking,
/// every access goes through the lock here.
pub struct SceneModel {
    tree: RwLock<QuadTree<SceneItem>>,
}

impl SceneModel {
    pub fn new(config: QuadTreeConfig) -> Result<Self, ModelError> {
        Ok(SceneModel {
            tree: RwLock::new(QuadTree::new(config)?),
        })
    }

    /// Inserts the whole batch or nothing.
    pub fn insert_items(&self, items: Vec<SceneItem>) -> Result<Vec<Uid>, ModelError> {
        let mut tree = self.tree.write();
        check_batch(&tree, &items)?;

        let uids = insert_batch(&mut tree, items)?;
        debug!("inserted {} items, {} total", uids.len(), tree.len());
        Ok(uids)
    }

    pub fn delete_items(&self, area: &Rect, uid: Option<Uid>) -> Vec<SceneItem> {
        let mut tree = self.tree.write();
        tree.remove(area, uid)
            .into_iter()
            .map(|(uid, item)| SceneItem { uid: Some(uid), ..item })
            .collect()
    }

    /// Moves an item by removing and reinserting it under the same uid.
    pub fn move_item(&self, uid: Uid, x: f64, y: f64) -> Result<(), ModelError> {
        let mut tree = self.tree.write();
        let bounds = tree.record(uid).ok_or(ModelError::UnknownUid(uid))?.bounds();

        tree.check_bounds(&Rect { x, y, ..bounds })?;

        for (_, item) in tree.remove(&bounds, Some(uid)) {
            tree.insert(SceneItem { uid: Some(uid), x, y, ..item })?;
        }
        Ok(())
    }

    pub fn query(&self, area: &Rect) -> Vec<SceneItem> {
        let tree = self.tree.read();
        tree.get_entries(area)
            .into_iter()
            .map(|(uid, item)| item.with_uid(uid))
            .collect()
    }

    pub fn stats(&self) -> TreeStats {
        let tree = self.tree.read();
        TreeStats {
            extent: tree.extent(),
            depth: tree.depth(),
            nodes: tree.node_count(),
            items: tree.len(),
        }
    }

    pub fn render(&self, size: u32) -> RgbImage {
        let tree = self.tree.read();
        render_overlay(&*tree, size)
    }

    /// all items sorted by uid
    pub fn items(&self) -> Vec<SceneItem> {
        let tree = self.tree.read();
        let mut items: Vec<SceneItem> = tree.iter().map(|(uid, item)| item.with_uid(uid)).collect();
        items.sort_by_key(|item| item.uid);
        items
    }

    pub fn save_state(&self, file_name: &str) -> Result<(), ModelError> {
        let state = serde_json::to_string_pretty(&self.items())?;

        let mut file = File::create(file_name)?;
        file.write_all(state.as_bytes())?;
        info!("saved state to {file_name}");
        Ok(())
    }

    /// Replaces the current items with the ones in the file, returns the item count.
    pub fn load_state(&self, file_name: &str) -> Result<usize, ModelError> {
        let mut file = File::open(file_name)?;
        let mut state = String::with_capacity(1024);
        file.read_to_string(&mut state)?;

        // the current tree is only replaced once the whole file has been accepted
        let items: Vec<SceneItem> = serde_json::from_str(&state)?;
        let count = items.len();

        let mut tree = self.tree.write();
        let mut loaded = QuadTree::new(tree.config().clone())?;
        check_batch(&loaded, &items)?;
        insert_batch(&mut loaded, items)?;
        *tree = loaded;

        info!("loaded {count} items from {file_name}");
        Ok(count)
    }

    pub fn clear_state(&self) {
        self.tree.write().clear();
    }
}


/// Fails on the first item that `tree` would reject, or on a uid repeated within the batch.
fn check_batch(tree: &QuadTree<SceneItem>, items: &[SceneItem]) -> Result<(), ModelError> {
    let mut batch = HashSet::new();
    for item in items {
        tree.check_bounds(&item.bounds())?;
        if let Some(uid) = item.uid {
            if tree.contains_uid(uid) {
                return Err(QuadTreeError::DuplicateUid(uid).into());
            }
            if !batch.insert(uid) {
                return Err(ModelError::DuplicateUidInBatch(uid));
            }
        }
    }
    Ok(())
}

fn insert_batch(tree: &mut QuadTree<SceneItem>, items: Vec<SceneItem>) -> Result<Vec<Uid>, ModelError> {
    let mut uids = Vec::with_capacity(items.len());
    for item in items {
        uids.push(tree.insert(item)?);
    }
    Ok(uids)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SceneModel {
        SceneModel::new(QuadTreeConfig::with_size(256)).unwrap()
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let model = model();
        model.insert_items(vec![SceneItem { uid: Some(3), ..SceneItem::new(0.0, 0.0, 1.0, 1.0) }]).unwrap();

        let batch = vec![
            SceneItem::new(10.0, 10.0, 1.0, 1.0),
            SceneItem { uid: Some(3), ..SceneItem::new(20.0, 20.0, 1.0, 1.0) },
        ];
        assert!(matches!(model.insert_items(batch), Err(ModelError::Tree(QuadTreeError::DuplicateUid(3)))));
        assert_eq!(model.stats().items, 1);

        let batch = vec![
            SceneItem { uid: Some(8), ..SceneItem::new(10.0, 10.0, 1.0, 1.0) },
            SceneItem { uid: Some(8), ..SceneItem::new(20.0, 20.0, 1.0, 1.0) },
        ];
        assert!(matches!(model.insert_items(batch), Err(ModelError::DuplicateUidInBatch(8))));

        let batch = vec![SceneItem::new(0.0, 0.0, -1.0, 1.0)];
        assert!(matches!(model.insert_items(batch), Err(ModelError::Tree(QuadTreeError::InvalidBounds(_)))));
        assert_eq!(model.stats().items, 1);
    }

    #[test]
    fn query_reports_assigned_uids() {
        let model = model();
        let uids = model.insert_items(vec![SceneItem::new(0.0, 0.0, 4.0, 4.0)]).unwrap();
        let found = model.query(&Rect::new(-1.0, -1.0, 2.0, 2.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uid, Some(uids[0]));
    }

    #[test]
    fn move_reinserts_under_same_uid() {
        let model = model();
        let uids = model.insert_items(vec![SceneItem::new(0.0, 0.0, 4.0, 4.0)]).unwrap();

        model.move_item(uids[0], 1000.0, 1000.0).unwrap();
        assert!(model.query(&Rect::new(0.0, 0.0, 4.0, 4.0)).is_empty());

        let found = model.query(&Rect::new(999.0, 999.0, 2.0, 2.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uid, Some(uids[0]));
        assert!(model.stats().extent.width > 256.0);

        assert!(matches!(model.move_item(999, 0.0, 0.0), Err(ModelError::UnknownUid(999))));
    }

    #[test]
    fn move_out_of_range_keeps_item() {
        let model = model();
        let uids = model.insert_items(vec![SceneItem::new(0.0, 0.0, 4.0, 4.0)]).unwrap();

        let moved = model.move_item(uids[0], f64::MAX * 0.75, 0.0);
        assert!(matches!(moved, Err(ModelError::Tree(QuadTreeError::OutOfRange(_)))));
        assert_eq!(model.query(&Rect::new(0.0, 0.0, 4.0, 4.0)).len(), 1);
    }

    #[test]
    fn delete_by_uid_leaves_neighbours() {
        let model = model();
        let uids = model
            .insert_items(vec![SceneItem::new(0.0, 0.0, 4.0, 4.0), SceneItem::new(1.0, 1.0, 4.0, 4.0)])
            .unwrap();

        let removed = model.delete_items(&Rect::new(0.0, 0.0, 5.0, 5.0), Some(uids[1]));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].uid, Some(uids[1]));
        assert_eq!(model.items().len(), 1);
    }
}
