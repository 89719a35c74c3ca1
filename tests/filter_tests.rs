use composition_gate::{
    access::{annotate, enforce, filter_tree},
    models::{AccessReason, ContentNode, SessionSnapshot, SessionUser, ViewerContext},
};
use uuid::Uuid;

// --- Helpers ---

fn alice() -> Option<SessionSnapshot> {
    Some(SessionSnapshot {
        user: SessionUser {
            id: Uuid::from_u128(7),
            name: Some("alice".to_string()),
            email: None,
        },
    })
}

fn kinds(nodes: &[ContentNode]) -> Vec<&str> {
    nodes.iter().filter_map(|n| n.kind.as_deref()).collect()
}

/// root → "main" → [NodeX(users)]
fn users_only_tree() -> ContentNode {
    ContentNode::default().with_child("main", ContentNode::new("NodeX").with_access_type("users"))
}

/// root → "s" → [NodeA(anonymous) → "inner" → [NodeB(everyone)]]
fn anonymous_parent_tree() -> ContentNode {
    ContentNode::default().with_child(
        "s",
        ContentNode::new("NodeA")
            .with_access_type("anonymous")
            .with_child("inner", ContentNode::new("NodeB").with_access_type("everyone")),
    )
}

// --- Scenarios ---

#[test]
fn test_scenario_a_users_node_removed_without_session() {
    let mut tree = annotate(users_only_tree(), &ViewerContext::new(false, None));
    let removed = filter_tree(&mut tree);

    assert_eq!(removed, 1);
    assert!(tree.slot("main").is_empty());
}

#[test]
fn test_scenario_b_users_node_kept_with_session() {
    let mut tree = annotate(users_only_tree(), &ViewerContext::new(false, alice()));
    filter_tree(&mut tree);

    let main = tree.slot("main");
    assert_eq!(kinds(main), vec!["NodeX"]);
    assert_eq!(
        main[0].derived_data.access_control.map(|d| d.reason),
        Some(AccessReason::Authorized)
    );
}

#[test]
fn test_scenario_c_editor_bypass_skips_filter() {
    let viewer = ViewerContext::new(true, None);
    let tree = enforce(users_only_tree(), &viewer);

    let main = tree.slot("main");
    assert_eq!(kinds(main), vec!["NodeX"]);
    let decision = main[0].derived_data.access_control.expect("annotated");
    assert!(decision.allowed);
    assert_eq!(decision.reason, AccessReason::CanvasMode);
}

#[test]
fn test_scenario_d_allowed_parent_keeps_children() {
    let tree = enforce(anonymous_parent_tree(), &ViewerContext::new(false, None));

    let s = tree.slot("s");
    assert_eq!(kinds(s), vec!["NodeA"]);
    assert_eq!(kinds(s[0].slot("inner")), vec!["NodeB"]);
}

#[test]
fn test_scenario_e_denied_parent_drops_allowed_children() {
    let tree = enforce(anonymous_parent_tree(), &ViewerContext::new(false, alice()));

    assert!(tree.slot("s").is_empty());
    let mut seen = Vec::new();
    tree.walk(&mut |node| seen.extend(node.kind.clone()));
    assert!(!seen.iter().any(|kind| kind == "NodeB"));
}

// --- Properties ---

#[test]
fn test_sibling_order_is_preserved() {
    let tree = ContentNode::default()
        .with_child("main", ContentNode::new("one"))
        .with_child("main", ContentNode::new("two").with_access_type("users"))
        .with_child("main", ContentNode::new("three").with_access_type("anonymous"))
        .with_child("main", ContentNode::new("four").with_access_type("users"))
        .with_child("main", ContentNode::new("five"));

    let filtered = enforce(tree, &ViewerContext::new(false, None));
    assert_eq!(kinds(filtered.slot("main")), vec!["one", "three", "five"]);
}

#[test]
fn test_filter_reaches_every_slot_at_every_level() {
    let tree = ContentNode::default()
        .with_child(
            "header",
            ContentNode::new("nav")
                .with_child("links", ContentNode::new("account").with_access_type("users"))
                .with_child("links", ContentNode::new("login").with_access_type("anonymous")),
        )
        .with_child(
            "footer",
            ContentNode::new("columns").with_child(
                "left",
                ContentNode::new("deep").with_child(
                    "leaf",
                    ContentNode::new("private").with_access_type("users"),
                ),
            ),
        );

    let filtered = enforce(tree, &ViewerContext::new(false, None));

    let nav = &filtered.slot("header")[0];
    assert_eq!(kinds(nav.slot("links")), vec!["login"]);
    let deep = &filtered.slot("footer")[0].slot("left")[0];
    assert!(deep.slot("leaf").is_empty());
}

#[test]
fn test_filtering_twice_is_a_no_op() {
    let mut tree = annotate(anonymous_parent_tree(), &ViewerContext::new(false, alice()));
    assert_eq!(filter_tree(&mut tree), 1);

    let after_first = tree.clone();
    assert_eq!(filter_tree(&mut tree), 0);
    assert_eq!(tree, after_first);
}

#[test]
fn test_everyone_nodes_always_survive_outside_bypass() {
    for session in [None, alice()] {
        let tree = ContentNode::default()
            .with_child("main", ContentNode::new("open"))
            .with_child("main", ContentNode::new("explicit").with_access_type("everyone"));

        let filtered = enforce(tree, &ViewerContext::new(false, session));
        assert_eq!(kinds(filtered.slot("main")), vec!["open", "explicit"]);
    }
}
