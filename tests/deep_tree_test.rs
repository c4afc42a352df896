//! Tests for trees nested far deeper than the thread stack would allow recursion

use tokentree::{NodeId, TreeArena, TreeNodeConvert};

/// Wraps a single leaf `levels` times with `push`, returning the outermost node.
fn pushed_chain(tree: &mut TreeArena<&'static str>, levels: usize) -> NodeId {
    let mut top = tree.new_node("x");
    for _ in 0..levels {
        top = tree.push(top, "p");
    }
    top
}

#[test]
fn given_100k_pushes_when_rendering_then_completes_with_full_nesting() {
    let mut tree = TreeArena::new();
    let top = pushed_chain(&mut tree, 100_000);

    let rendered = tree.render(top);

    let expected = format!("{}x{}", "[p:".repeat(100_000), "]".repeat(100_000));
    assert_eq!(rendered.len(), expected.len());
    assert_eq!(rendered, expected);
    assert_eq!(tree.display(top).to_string().len(), expected.len());
}

#[test]
fn given_100k_pushes_when_reading_content_then_renders_inner_chain() {
    let mut tree = TreeArena::new();
    let top = pushed_chain(&mut tree, 100_000);

    let content = tree.string_content(top);

    assert!(content.starts_with("[p:[p:"));
    assert_eq!(content.matches('x').count(), 1);
    assert_eq!(content.len(), 4 * 99_999 + 1);
}

#[test]
fn given_100k_pushes_when_measuring_then_depth_counts_every_level() {
    let mut tree = TreeArena::new();
    let top = pushed_chain(&mut tree, 100_000);

    assert_eq!(tree.depth(top), 100_001);
    assert_eq!(tree.leaf_values(top), vec![&"x"]);
}

#[test]
fn given_deep_chain_when_converting_to_termtree_then_keeps_every_level() {
    // termtree drops and prints its own nodes recursively, which bounds this depth
    let mut tree = TreeArena::new();
    let top = pushed_chain(&mut tree, 1_000);

    let mut view = tree.to_tree_string(top);
    let mut levels = 1;
    while let Some(child) = view.leaves.pop() {
        assert!(view.leaves.is_empty());
        view = child;
        levels += 1;
    }

    assert_eq!(levels, 1_001);
    assert_eq!(view.root, "x");
}

#[test]
fn given_wide_and_deep_tree_when_rendering_then_siblings_stay_in_order() {
    let mut tree = TreeArena::new();
    let top = pushed_chain(&mut tree, 50_000);
    tree.add(top, "y");
    tree.add(top, "z");

    let rendered = tree.render(top);

    assert!(rendered.ends_with("x]]],y,z]"));
}
