use std::collections::{HashMap, HashSet};

use log::debug;

use crate::quadtree::node::{LeafBox, Node, SplitLimits};
use crate::quadtree::{QuadTreeConfig, QuadTreeError, Rect, Uid, UidRegistry};

/// Anything that can be stored in a [`QuadTree`].
pub trait Bounded {
    fn bounds(&self) -> Rect;

    /// stable caller id, used as the item's uid when present
    fn uid(&self) -> Option<Uid> {
        None
    }
}

impl Bounded for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// Auto-growing region quadtree.
///
/// Records live in a side table keyed by uid, nodes only keep [`LeafBox`] copies.
/// A box that crosses a split line is stored in every quadrant it touches,
/// queries and removals deduplicate by uid.
///
/// When an inserted box does not fit into the root extent the tree grows:
/// the side length doubles toward the box until it fits, then everything is reinserted
/// into a fresh root.
///
/// There is no internal locking, callers must serialize access.
#[derive(Debug)]
pub struct QuadTree<T> {
    config: QuadTreeConfig,
    limits: SplitLimits,
    root: Node,
    records: HashMap<Uid, T>,
    uids: UidRegistry,
}

impl<T: Bounded> Default for QuadTree<T> {
    fn default() -> Self {
        Self::build(QuadTreeConfig::default())
    }
}

impl<T: Bounded> QuadTree<T> {
    pub fn new(config: QuadTreeConfig) -> Result<Self, QuadTreeError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: QuadTreeConfig) -> Self {
        let (x, y) = config.origin();
        let limits = SplitLimits {
            max_leafs_per_node: config.max_leafs_per_node,
            max_depth: config.max_depth,
        };

        QuadTree {
            root: Node::new(x, y, config.size as f64, 0),
            config,
            limits,
            records: HashMap::new(),
            uids: UidRegistry::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }

    /// current extent of the root node
    #[inline]
    pub fn extent(&self) -> Rect {
        *self.root.rect()
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn record(&self, uid: Uid) -> Option<&T> {
        self.records.get(&uid)
    }

    #[inline]
    pub fn contains_uid(&self, uid: Uid) -> bool {
        self.uids.is_live(uid)
    }

    /// stored records in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (Uid, &T)> {
        self.records.iter().map(|(uid, record)| (*uid, record))
    }

    /// depth of the deepest node
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        self.root.visit(&mut |node| depth = depth.max(node.depth()));
        depth
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.root.visit(&mut |_| count += 1);
        count
    }

    /// Stores `record` and returns its uid.
    /// Fails if the record's own uid is already taken, its bounds are not a valid box
    /// or the extent needed to reach them is not representable.
    pub fn insert(&mut self, record: T) -> Result<Uid, QuadTreeError> {
        let rect = record.bounds();
        let extent = self.fitting_extent(&rect)?;

        let uid = self.uids.allocate(record.uid())?;
        self.records.insert(uid, record);

        let leaf = LeafBox::new(rect, uid);
        if extent == *self.root.rect() {
            self.root.insert(leaf, &self.limits);
        } else {
            self.grow(extent, leaf);
        }

        Ok(uid)
    }

    /// Checks that `rect` can be stored without changing anything.
    pub fn check_bounds(&self, rect: &Rect) -> Result<(), QuadTreeError> {
        self.fitting_extent(rect).map(|_| ())
    }

    /// Records overlapping `area`, each once, in depth-first q0..q3 order of first appearance.
    pub fn get(&self, area: &Rect) -> Vec<&T> {
        self.get_entries(area).into_iter().map(|(_, record)| record).collect()
    }

    /// same as [`QuadTree::get`] but paired with uids
    pub fn get_entries(&self, area: &Rect) -> Vec<(Uid, &T)> {
        self.query(area)
            .into_iter()
            .filter_map(|leaf| self.records.get(&leaf.uid).map(|record| (leaf.uid, record)))
            .collect()
    }

    /// Removes records overlapping `area` and hands them back with their released uids.
    /// With `record` set only the record stored under that uid is removed.
    pub fn remove(&mut self, area: &Rect, record: Option<Uid>) -> Vec<(Uid, T)> {
        match record {
            None => self.remove_where(area, |_| true),
            Some(uid) => self.remove_uids(area, |candidate| candidate == uid),
        }
    }

    /// Removes records overlapping `area` for which `filter` returns true.
    pub fn remove_where<F: FnMut(&T) -> bool>(&mut self, area: &Rect, mut filter: F) -> Vec<(Uid, T)> {
        let records = &self.records;
        let mut removed = Vec::new();
        self.root.remove(area, &mut |uid| records.get(&uid).is_some_and(&mut filter), &mut removed);
        self.release(removed)
    }

    fn remove_uids<F: FnMut(Uid) -> bool>(&mut self, area: &Rect, mut filter: F) -> Vec<(Uid, T)> {
        let mut removed = Vec::new();
        self.root.remove(area, &mut filter, &mut removed);
        self.release(removed)
    }

    /// Purges the remaining copies of every removed box, then drops side table entries and uids
    /// once per uid.
    fn release(&mut self, removed: Vec<LeafBox>) -> Vec<(Uid, T)> {
        let mut seen = HashSet::with_capacity(removed.len());
        let boxes: Vec<LeafBox> = removed.into_iter().filter(|leaf| seen.insert(leaf.uid)).collect();

        // copies in quadrants the removal area did not reach
        let mut copies = Vec::new();
        for leaf in &boxes {
            self.root.remove(&leaf.rect, &mut |uid| uid == leaf.uid, &mut copies);
        }

        let mut records = Vec::with_capacity(boxes.len());
        for leaf in boxes {
            self.uids.release(leaf.uid);
            if let Some(record) = self.records.remove(&leaf.uid) {
                records.push((leaf.uid, record));
            }
        }

        if !records.is_empty() {
            debug!("removed {} records, {} left", records.len(), self.records.len());
        }
        records
    }

    /// Drops every record and leaves an empty root with the current extent.
    pub fn clear(&mut self) {
        let Rect { x, y, width, .. } = *self.root.rect();
        self.root = Node::new(x, y, width, 0);
        self.records.clear();
        self.uids.clear();
    }

    /// unique stored boxes overlapping `area` in traversal order
    fn query(&self, area: &Rect) -> Vec<LeafBox> {
        let mut leafs = Vec::new();
        self.root.collect(area, &mut leafs);

        let mut seen = HashSet::with_capacity(leafs.len());
        leafs.retain(|leaf| seen.insert(leaf.uid));
        leafs
    }

    /// Root extent after inserting `rect`: the current one if it fits, otherwise doubled
    /// toward the box center on each axis until it does.
    fn fitting_extent(&self, rect: &Rect) -> Result<Rect, QuadTreeError> {
        if !rect.is_valid() {
            return Err(QuadTreeError::InvalidBounds(*rect));
        }

        let mut extent = *self.root.rect();
        while !extent.contains(rect) {
            let size = extent.width;
            let x = if rect.cx() < extent.cx() { extent.x - size } else { extent.x };
            let y = if rect.cy() < extent.cy() { extent.y - size } else { extent.y };
            extent = Rect::square(x, y, size * 2.0);
            if !extent.is_valid() || !extent.right().is_finite() || !extent.bottom().is_finite() {
                return Err(QuadTreeError::OutOfRange(*rect));
            }
        }
        Ok(extent)
    }

    fn grow(&mut self, extent: Rect, leaf: LeafBox) {
        let old = *self.root.rect();
        debug!(
            "grow tree from ({}, {}) size {} to ({}, {}) size {}",
            old.x, old.y, old.width, extent.x, extent.y, extent.width
        );

        let leafs = self.query(&old);
        self.root = Node::new(extent.x, extent.y, extent.width, 0);
        for stored in leafs {
            self.root.insert(stored, &self.limits);
        }
        self.root.insert(leaf, &self.limits);
    }
}
