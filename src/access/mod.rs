//! Server-side composition access control.
//!
//! Two passes over a page's content tree: `annotate` records, on every node,
//! who is viewing and whether that viewer may see the node; `filter_tree`
//! then drops the denied nodes. Editor bypass keeps the full annotated tree so
//! authors can see every node together with its decision.

pub mod annotator;
pub mod filter;
pub mod mode;

pub use annotator::{AnnotatedTree, annotate, decide};
pub use filter::filter_tree;
pub use mode::EditorMode;

use crate::models::{ContentNode, ViewerContext};

/// enforce
///
/// Runs the full pipeline for one request: annotation always, filtering only
/// when the viewer is not in editor bypass.
pub fn enforce(tree: ContentNode, viewer: &ViewerContext) -> AnnotatedTree {
    let mut annotated = annotate(tree, viewer);
    if !viewer.is_editor_bypass {
        filter_tree(&mut annotated);
    }
    annotated
}
