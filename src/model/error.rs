use thiserror::Error;

use crate::quadtree::{QuadTreeError, Uid};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Tree(#[from] QuadTreeError),

    #[error("state file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state format error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown uid {0}")]
    UnknownUid(Uid),

    #[error("uid {0} appears more than once in the batch")]
    DuplicateUidInBatch(Uid),
}
