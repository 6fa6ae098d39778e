use serde::{Deserialize, Serialize};

use crate::quadtree::QuadTreeError;

pub const DEFAULT_SIZE: u64 = 4096;
pub const DEFAULT_MAX_LEAFS_PER_NODE: usize = 4;
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Construction parameters of a tree.
/// The origin defaults to `-size/2` on both axes, which centers the initial extent on (0, 0).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct QuadTreeConfig {
    pub size: u64,
    pub max_leafs_per_node: usize,
    pub max_depth: usize,
    pub origin_x: Option<f64>,
    pub origin_y: Option<f64>,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        QuadTreeConfig {
            size: DEFAULT_SIZE,
            max_leafs_per_node: DEFAULT_MAX_LEAFS_PER_NODE,
            max_depth: DEFAULT_MAX_DEPTH,
            origin_x: None,
            origin_y: None,
        }
    }
}

impl QuadTreeConfig {
    pub fn with_size(size: u64) -> Self {
        QuadTreeConfig { size, ..Default::default() }
    }

    pub fn validate(&self) -> Result<(), QuadTreeError> {
        if !self.size.is_power_of_two() {
            return Err(QuadTreeError::BadSize(self.size));
        }
        if self.max_leafs_per_node < 1 {
            return Err(QuadTreeError::BadMaxLeafsPerNode(self.max_leafs_per_node));
        }
        if self.max_depth < 1 {
            return Err(QuadTreeError::BadMaxDepth(self.max_depth));
        }
        Ok(())
    }

    /// top-left corner of the initial extent
    pub fn origin(&self) -> (f64, f64) {
        let half = -(self.size as f64) / 2.0;
        (self.origin_x.unwrap_or(half), self.origin_y.unwrap_or(half))
    }
}
