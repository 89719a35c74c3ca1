use crate::models::{AccessDecision, AccessReason, AccessType, AuthState, ContentNode, ViewerContext};
use std::ops::Deref;

/// AnnotatedTree
///
/// A content tree on which every node carries `_authState` and `_accessControl`.
/// Only `annotate` constructs one, which makes "annotate before filter" an
/// interface-level contract rather than a calling convention.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedTree(pub(crate) ContentNode);

impl AnnotatedTree {
    pub fn root(&self) -> &ContentNode {
        &self.0
    }

    pub fn into_inner(self) -> ContentNode {
        self.0
    }
}

impl Deref for AnnotatedTree {
    type Target = ContentNode;

    fn deref(&self) -> &ContentNode {
        &self.0
    }
}

/// decide
///
/// The access policy for a single node. First matching rule wins:
/// editor bypass, then `everyone`, then the two session-dependent denials,
/// otherwise authorized.
pub fn decide(access_type: AccessType, viewer: &ViewerContext) -> AccessDecision {
    let (allowed, reason) = if viewer.is_editor_bypass {
        (true, AccessReason::CanvasMode)
    } else {
        match (access_type, viewer.is_authenticated()) {
            (AccessType::Everyone, _) => (true, AccessReason::Everyone),
            (AccessType::Users, false) => (false, AccessReason::RequiresAuth),
            (AccessType::Anonymous, true) => (false, AccessReason::AnonymousOnly),
            _ => (true, AccessReason::Authorized),
        }
    };
    AccessDecision { allowed, reason }
}

/// annotate
///
/// Writes the viewer's auth snapshot and the node's access decision onto every
/// node of `tree`, root included. Nothing is removed or reordered.
///
/// Deterministic in `(tree, viewer)`: annotating the `into_inner()` of an
/// annotated tree again with the same viewer yields identical derived data.
pub fn annotate(mut tree: ContentNode, viewer: &ViewerContext) -> AnnotatedTree {
    let auth_state = viewer.auth_state();
    let visited = annotate_node(&mut tree, &auth_state, viewer);
    tracing::debug!(
        nodes = visited,
        authenticated = auth_state.is_authenticated,
        editor_bypass = viewer.is_editor_bypass,
        "annotated content tree"
    );
    AnnotatedTree(tree)
}

fn annotate_node(node: &mut ContentNode, auth_state: &AuthState, viewer: &ViewerContext) -> usize {
    node.derived_data.auth_state = Some(auth_state.clone());
    node.derived_data.access_control = Some(decide(node.access_type(), viewer));

    let mut visited = 1;
    for child in node.children.values_mut().flatten() {
        visited += annotate_node(child, auth_state, viewer);
    }
    visited
}
