//! Lazily loaded project tree: the path-tree model, its flattened projection
//! and the loader that fills it from the Core.

pub mod loader;
pub mod model;
pub mod projection;
