//! Filesystem layout of the content root.
//!
//! Provides:
//! - Category and stream enumeration and creation
//! - Item and directory name rules
//! - Atomic state file writes

pub mod atomic;
pub mod naming;
pub mod tree;

pub use atomic::write_atomic;
pub use naming::{sanitize_item_name, sanitize_path_component, MediaFileName};
pub use tree::{
    create_category, create_stream, move_stream, next_up, rename_category, Category, CategoryTree,
    StreamHandle,
};
