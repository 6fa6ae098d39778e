pub mod config;
pub mod error;
pub mod node;
pub mod rect;
pub mod tree;
pub mod uid_registry;

pub use config::QuadTreeConfig;
pub use error::QuadTreeError;
pub use node::{LeafBox, Node, NodeContent};
pub use rect::Rect;
pub use tree::{Bounded, QuadTree};
pub use uid_registry::{Uid, UidRegistry};
