pub mod error;
pub mod overlay;
pub mod scene_model;

pub use error::ModelError;
pub use overlay::render_overlay;
pub use scene_model::{SceneItem, SceneModel, TreeStats};
