use super::annotator::AnnotatedTree;
use crate::models::ContentNode;

/// filter_tree
///
/// Removes every child whose `_accessControl.allowed` is `false`, in every slot
/// at every level. A denied node is excised together with its subtree; a kept
/// node's slots are filtered with the same rule. Surviving siblings keep their
/// order, and nodes without a decision are kept.
///
/// Never call this in editor bypass mode. Returns the number of nodes excised
/// (descendants of an excised node are not counted separately).
pub fn filter_tree(tree: &mut AnnotatedTree) -> usize {
    let removed = prune(&mut tree.0);
    tracing::debug!(removed, "filtered content tree");
    removed
}

fn prune(node: &mut ContentNode) -> usize {
    let mut removed = 0;
    for children in node.children.values_mut() {
        let before = children.len();
        children.retain(|child| child.derived_data.is_viewable());
        removed += before - children.len();

        for child in children.iter_mut() {
            removed += prune(child);
        }
    }
    removed
}
