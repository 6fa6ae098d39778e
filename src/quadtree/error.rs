use thiserror::Error;

use crate::quadtree::{Rect, Uid};

/// Errors reported by the quadtree engine.
/// Configuration errors come from construction, the rest from `insert`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuadTreeError {
    #[error("bad size {0}, must be a power of two")]
    BadSize(u64),

    #[error("bad max_leafs_per_node {0}, must be greater than 0")]
    BadMaxLeafsPerNode(usize),

    #[error("bad max_depth {0}, must be greater than 0")]
    BadMaxDepth(usize),

    #[error("uid {0} is already in use")]
    DuplicateUid(Uid),

    #[error("invalid bounds {0:?}, expected finite coordinates and a non-negative size")]
    InvalidBounds(Rect),

    #[error("bounds {0:?} are too far away, the tree extent would overflow")]
    OutOfRange(Rect),
}

