use std::mem;

use log::trace;

use crate::quadtree::{Rect, Uid};

/// nodes this small are never split, so children keep a positive size
const MIN_SPLIT_SIZE: f64 = 2.0;

/// Stored bounding box of one record. Nodes own copies of it,
/// the record itself lives in the tree's side table under `uid`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LeafBox {
    pub rect: Rect,
    pub uid: Uid,
}

impl LeafBox {
    #[inline]
    pub fn new(rect: Rect, uid: Uid) -> Self {
        LeafBox { rect, uid }
    }
}

/// Limits that gate splitting, copied from the tree configuration
#[derive(Debug, Copy, Clone)]
pub struct SplitLimits {
    pub max_leafs_per_node: usize,
    pub max_depth: usize,
}

#[derive(Debug)]
pub enum NodeContent {
    Leafs(Vec<LeafBox>),
    Quads(Box<[Node; 4]>),
}

/*
    quadrants[4]
 q0 | q1    top-left | top-right
   ---
 q2 | q3    bottom-left | bottom-right
 */

#[derive(Debug)]
pub struct Node {
    rect: Rect,
    depth: usize,
    content: NodeContent,
}

impl Node {
    pub fn new(x: f64, y: f64, size: f64, depth: usize) -> Self {
        Node {
            rect: Rect::square(x, y, size),
            depth,
            content: NodeContent::Leafs(vec![]),
        }
    }

    #[inline]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leafs(_))
    }

    /// stored boxes of a leaf-node, None for internal nodes
    pub fn leafs(&self) -> Option<&[LeafBox]> {
        match &self.content {
            NodeContent::Leafs(leafs) => Some(leafs),
            NodeContent::Quads(_) => None,
        }
    }

    /// children of an internal node in q0..q3 order, None for leaf-nodes
    pub fn quads(&self) -> Option<&[Node; 4]> {
        match &self.content {
            NodeContent::Leafs(_) => None,
            NodeContent::Quads(quads) => Some(quads),
        }
    }

    /// no item-box anywhere in the subtree
    pub fn is_empty(&self) -> bool {
        match &self.content {
            NodeContent::Leafs(leafs) => leafs.is_empty(),
            NodeContent::Quads(quads) => quads.iter().all(Node::is_empty),
        }
    }

    /// depth-first walk in q0..q3 order, parents before children
    pub fn visit<F: FnMut(&Node)>(&self, f: &mut F) {
        f(self);
        if let NodeContent::Quads(quads) = &self.content {
            for quad in quads.iter() {
                quad.visit(f);
            }
        }
    }

    fn can_split(&self, limits: &SplitLimits) -> bool {
        self.depth + 1 < limits.max_depth && self.rect.width > MIN_SPLIT_SIZE
    }

    pub fn insert(&mut self, leaf: LeafBox, limits: &SplitLimits) {
        let overloaded = match &mut self.content {
            NodeContent::Leafs(leafs) => {
                leafs.push(leaf);
                leafs.len() >= limits.max_leafs_per_node
            }

            NodeContent::Quads(quads) => {
                // a box on a split line goes to every quadrant it touches
                for quad in quads.iter_mut() {
                    if quad.rect.overlaps(&leaf.rect) {
                        quad.insert(leaf, limits);
                    }
                }
                false
            }
        };

        if overloaded && self.can_split(limits) {
            self.split(limits);
        }
    }

    fn split(&mut self, limits: &SplitLimits) {
        let Rect { x, y, width, .. } = self.rect;
        let half = width / 2.0;
        let depth = self.depth + 1;

        let quads = Box::new([
            Node::new(x, y, half, depth),                 // q0
            Node::new(x + half, y, half, depth),          // q1
            Node::new(x, y + half, half, depth),          // q2
            Node::new(x + half, y + half, half, depth),   // q3
        ]);

        trace!("split node at ({x}, {y}) size {width} depth {}", self.depth);
        let content = mem::replace(&mut self.content, NodeContent::Quads(quads));
        if let NodeContent::Leafs(leafs) = content {
            for leaf in leafs {
                self.insert(leaf, limits);
            }
        }
    }

    fn merge(&mut self) {
        trace!("merge node at ({}, {}) depth {}", self.rect.x, self.rect.y, self.depth);
        self.content = NodeContent::Leafs(vec![]);
    }

    /// appends every stored box overlapping `area`, duplicates included
    pub fn collect(&self, area: &Rect, result: &mut Vec<LeafBox>) {
        match &self.content {
            NodeContent::Leafs(leafs) => {
                result.extend(leafs.iter().filter(|leaf| area.overlaps(&leaf.rect)));
            }

            NodeContent::Quads(quads) => {
                for quad in quads.iter() {
                    if area.overlaps(&quad.rect) {
                        quad.collect(area, result);
                    }
                }
            }
        }
    }

    /// Removes boxes overlapping `area` that pass `filter` and pushes them to `removed`.
    /// Survivors keep their relative order. Internal nodes whose subtree ends up empty merge.
    /// Copies of a removed box in quadrants outside `area` are left alone.
    pub fn remove<F: FnMut(Uid) -> bool>(&mut self, area: &Rect, filter: &mut F, removed: &mut Vec<LeafBox>) {
        let emptied = match &mut self.content {
            NodeContent::Leafs(leafs) => {
                leafs.retain(|leaf| {
                    if area.overlaps(&leaf.rect) && filter(leaf.uid) {
                        removed.push(*leaf);
                        false
                    } else {
                        true
                    }
                });
                false
            }

            NodeContent::Quads(quads) => {
                for quad in quads.iter_mut() {
                    if area.overlaps(&quad.rect) {
                        quad.remove(area, filter, removed);
                    }
                }
                quads.iter().all(Node::is_empty)
            }
        };

        if emptied {
            self.merge();
        }
    }
}
