use std::collections::HashSet;
use std::fmt;

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::errors::{TreeError, TreeResult};
use crate::token::Token;

/// Handle of a node inside a [`TreeArena`].
///
/// Two handles compare equal only if they address the same node, so a
/// `NodeId` is the node's identity. Handles of freed nodes are never reused
/// for a different node (generational index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}.{}", slot, generation)
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode<T> {
    /// Token carried by this node, fixed at construction
    value: T,
    /// Parent node, None for roots. Non-owning.
    parent: Option<NodeId>,
    /// Owned child nodes in insertion order
    children: Vec<NodeId>,
}

impl<T> TreeNode<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Parent as recorded on this node.
    ///
    /// After [`TreeArena::remove_child`] this still names the old parent.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena holding every node of one or more token trees.
///
/// Nodes are created standalone with [`TreeArena::new_node`] and then wired
/// into a hierarchy with [`TreeArena::add_element`] or spliced above an
/// existing node with [`TreeArena::push_element`]. The arena owns all node
/// storage; a node's position in the hierarchy is expressed only through
/// `NodeId` links.
///
/// Passing a `NodeId` that does not belong to this arena, or whose node has
/// been freed, is a caller bug and panics with [`TreeError::StaleNode`].
#[derive(Debug)]
pub struct TreeArena<T> {
    arena: Arena<TreeNode<T>>,
}

impl<T> Default for TreeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TreeArena<T> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Creates a parentless node without children.
    #[instrument(level = "trace", skip(self, value))]
    pub fn new_node(&mut self, value: T) -> NodeId {
        NodeId(self.arena.insert(TreeNode::new(value)))
    }

    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.arena.get(id.0)
    }

    pub fn try_node(&self, id: NodeId) -> TreeResult<&TreeNode<T>> {
        self.arena.get(id.0).ok_or(TreeError::StaleNode(id))
    }

    fn node(&self, id: NodeId) -> &TreeNode<T> {
        self.try_node(id).unwrap_or_else(|e| panic!("{}", e))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode<T> {
        match self.arena.get_mut(id.0) {
            Some(node) => node,
            None => panic!("{}", TreeError::StaleNode(id)),
        }
    }

    pub fn value(&self, id: NodeId) -> &T {
        &self.node(id).value
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.live_parent(id).is_none()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    pub fn last_element(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn last(&self, id: NodeId) -> Option<&T> {
        self.last_element(id).map(|last| self.value(last))
    }

    /// Start of the ordered child sequence; continue with [`Self::next_sibling`].
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.live_parent(id)?;
        let siblings = &self.node(parent).children;
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.iter().copied()
    }

    /// Topmost ancestor of `id`, or `id` itself for a root.
    ///
    /// After splicing above a root with [`Self::push_element`] this yields
    /// the new root.
    #[instrument(level = "trace", skip(self))]
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.live_parent(current) {
            current = parent;
        }
        current
    }

    /// Parent link, ignoring one left stale by `remove_child`.
    fn live_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        self.arena
            .get(parent.0)
            .filter(|p| p.children.contains(&id))
            .map(|_| parent)
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == candidate {
                return true;
            }
            current = self.live_parent(node);
        }
        false
    }

    /// Points `id` at `parent`, first taking it out of its current parent's
    /// children. Does not add `id` to `parent`'s children.
    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        if let Some(old) = self.node(id).parent {
            // a stale link from remove_child no longer lists the node
            if let Some(old_node) = self.arena.get_mut(old.0) {
                if let Some(pos) = old_node.children.iter().position(|&c| c == id) {
                    old_node.children.remove(pos);
                    debug!(node = %id, old_parent = %old, "detached from parent");
                }
            }
        }
        self.node_mut(id).parent = parent;
    }

    /// Appends `node` to the children of `parent` and returns `node`.
    ///
    /// A node that already has a parent is moved, never shared: it is removed
    /// from its old parent first. Re-adding an existing child moves it to the
    /// end.
    #[instrument(level = "trace", skip(self))]
    pub fn add_element(&mut self, parent: NodeId, node: NodeId) -> NodeId {
        if parent == node {
            panic!("{}", TreeError::SelfAdoption(node));
        }
        debug_assert!(
            !self.is_ancestor_or_self(node, parent),
            "{} is an ancestor of {}",
            node,
            parent
        );
        if let Err(e) = self.try_node(parent) {
            panic!("{}", e);
        }
        self.set_parent(node, Some(parent));
        self.node_mut(parent).children.push(node);
        node
    }

    pub fn add(&mut self, parent: NodeId, value: T) -> NodeId {
        let node = self.new_node(value);
        self.add_element(parent, node)
    }

    /// Splices `replacement` into the place `node` holds and hangs `node`
    /// below it. Returns `replacement`.
    ///
    /// ```text
    /// A(B)   push_element(B, C)   A(C(B))
    /// B      push_element(B, C)   C(B)
    /// ```
    ///
    /// `replacement` is taken out of its current parent first. When `node` is
    /// a root nothing points at `replacement` afterwards; the caller has to
    /// track it as the new root.
    #[instrument(level = "trace", skip(self))]
    pub fn push_element(&mut self, node: NodeId, replacement: NodeId) -> NodeId {
        if node == replacement {
            panic!("{}", TreeError::SelfAdoption(node));
        }
        // both handles are checked before anything is rewired
        if let Err(e) = self.try_node(node).and(self.try_node(replacement)) {
            panic!("{}", e);
        }
        debug_assert!(
            !self.is_ancestor_or_self(replacement, node),
            "{} is an ancestor of {}",
            replacement,
            node
        );

        self.set_parent(replacement, None);
        if let Some(parent) = self.node(node).parent {
            let slot = self.node(parent).children.iter().position(|&c| c == node);
            match slot {
                Some(pos) => {
                    // overwrite the slot in place so sibling order is kept
                    self.node_mut(parent).children[pos] = replacement;
                    self.node_mut(replacement).parent = Some(parent);
                    debug!(node = %node, replacement = %replacement, parent = %parent, "spliced");
                }
                None => {
                    debug!(node = %node, stale_parent = %parent, "stale parent link, splicing as root");
                }
            }
            self.node_mut(node).parent = None;
        }

        self.add_element(replacement, node);
        replacement
    }

    pub fn push(&mut self, node: NodeId, value: T) -> NodeId {
        let replacement = self.new_node(value);
        self.push_element(node, replacement)
    }

    /// Child of `parent` that is `node` itself, compared by identity.
    #[instrument(level = "trace", skip(self))]
    pub fn find_child_element(&self, parent: NodeId, node: NodeId) -> Option<NodeId> {
        self.node(parent).children.iter().copied().find(|&c| c == node)
    }

    /// First child of `parent`, in insertion order, whose value equals `value`.
    #[instrument(level = "trace", skip(self, value))]
    pub fn find_child(&self, parent: NodeId, value: &T) -> Option<NodeId>
    where
        T: PartialEq,
    {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).value == *value)
    }

    /// Removes `node` from the children of `parent`.
    ///
    /// `node` keeps naming `parent` as its parent; reattach it or call
    /// [`Self::detach`] instead if that matters.
    ///
    /// # Panics
    /// If `node` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, node: NodeId) {
        if let Err(e) = self.try_remove_child(parent, node) {
            panic!("{}", e);
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn try_remove_child(&mut self, parent: NodeId, node: NodeId) -> TreeResult<()> {
        let parent_node = self
            .arena
            .get_mut(parent.0)
            .ok_or(TreeError::StaleNode(parent))?;
        let pos = parent_node
            .children
            .iter()
            .position(|&c| c == node)
            .ok_or(TreeError::NotAChild {
                parent,
                child: node,
            })?;
        parent_node.children.remove(pos);
        debug!(node = %node, parent = %parent, "removed child");
        Ok(())
    }

    /// Takes `id` out of its parent and clears its parent link.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, id: NodeId) {
        self.set_parent(id, None);
    }

    /// Detaches `id` and frees it together with all its descendants.
    ///
    /// Returns the number of freed nodes. Their handles become stale.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        self.detach(id);
        let doomed: Vec<NodeId> = self.iter_postorder(id).map(|(idx, _)| idx).collect();
        for &idx in &doomed {
            self.arena.remove(idx.0);
        }
        debug!(root = %id, freed = doomed.len(), "freed subtree");
        doomed.len()
    }

    /// Pre-order walk of the subtree rooted at `id`.
    pub fn iter(&self, id: NodeId) -> TreeIterator<'_, T> {
        TreeIterator::new(self, id)
    }

    /// Post-order walk of the subtree rooted at `id`.
    pub fn iter_postorder(&self, id: NodeId) -> PostOrderIterator<'_, T> {
        PostOrderIterator::new(self, id)
    }

    /// Number of levels in the subtree rooted at `id`; 1 for a leaf.
    #[instrument(level = "trace", skip(self))]
    pub fn depth(&self, id: NodeId) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(id, 1)];
        while let Some((current, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(self.node(current).children.iter().map(|&c| (c, level + 1)));
        }
        deepest
    }

    /// Values of the leaves below `id`, left to right.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_values(&self, id: NodeId) -> Vec<&T> {
        self.iter(id)
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| &node.value)
            .collect()
    }
}

impl<T: Token> TreeArena<T> {
    /// Rendering of the children of `id`, or of the error its token reports.
    ///
    /// An error replaces the children's text entirely. A childless node
    /// without error has empty content.
    pub fn string_content(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.value.error() {
            Some(err) => format!("[ERROR: {}]", err),
            None => node.children.iter().map(|&c| self.render(c)).join(","),
        }
    }

    /// Diagnostic rendering: the token text for nodes with empty content,
    /// `[token:content]` otherwise.
    ///
    /// `A(C(B))` renders as `[A:[C:B]]`. Not a stable serialization format.
    pub fn render(&self, id: NodeId) -> String {
        let empty = self.empty_content(id);
        let mut out = String::new();
        let mut steps = vec![RenderStep::Enter(id)];

        while let Some(step) = steps.pop() {
            let current = match step {
                RenderStep::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                RenderStep::Enter(current) => current,
            };
            let node = self.node(current);
            let value = node.value.to_string();
            if empty.contains(&current) {
                out.push_str(&value);
                continue;
            }
            out.push('[');
            out.push_str(&value);
            out.push(':');
            match node.value.error() {
                Some(err) => out.push_str(&format!("[ERROR: {}]]", err)),
                None => {
                    steps.push(RenderStep::Text("]"));
                    for (i, &child) in node.children.iter().enumerate().rev() {
                        steps.push(RenderStep::Enter(child));
                        if i > 0 {
                            steps.push(RenderStep::Text(","));
                        }
                    }
                }
            }
        }
        out
    }

    /// Nodes below `id` (inclusive) whose content renders as the empty string.
    fn empty_content(&self, id: NodeId) -> HashSet<NodeId> {
        let mut empty = HashSet::new();
        // whether each finished node rendered as "", children on top
        let mut renders_empty: Vec<bool> = Vec::new();

        for (current, node) in self.iter_postorder(id) {
            let kids = renders_empty.split_off(renders_empty.len() - node.children.len());
            let content_empty = node.value.error().is_none()
                && match kids.as_slice() {
                    [] => true,
                    [only] => *only,
                    _ => false,
                };
            if content_empty {
                empty.insert(current);
            }
            renders_empty.push(content_empty && node.value.to_string().is_empty());
        }
        empty
    }

    pub fn display(&self, id: NodeId) -> NodeDisplay<'_, T> {
        NodeDisplay { arena: self, id }
    }
}

enum RenderStep {
    Enter(NodeId),
    Text(&'static str),
}

/// [`fmt::Display`] adaptor for [`TreeArena::render`].
pub struct NodeDisplay<'a, T> {
    arena: &'a TreeArena<T>,
    id: NodeId,
}

impl<T: Token> fmt::Display for NodeDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.arena.render(self.id))
    }
}

pub struct TreeIterator<'a, T> {
    arena: &'a TreeArena<T>,
    stack: Vec<NodeId>,
}

impl<'a, T> TreeIterator<'a, T> {
    fn new(arena: &'a TreeArena<T>, start: NodeId) -> Self {
        Self {
            arena,
            stack: vec![start],
        }
    }
}

impl<'a, T> Iterator for TreeIterator<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        let node = self.arena.node(current);
        // Push children in reverse order for left-to-right traversal
        self.stack.extend(node.children.iter().rev().copied());
        Some((current, node))
    }
}

pub struct PostOrderIterator<'a, T> {
    arena: &'a TreeArena<T>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, T> PostOrderIterator<'a, T> {
    fn new(arena: &'a TreeArena<T>, start: NodeId) -> Self {
        Self {
            arena,
            stack: vec![(start, false)],
        }
    }
}

impl<'a, T> Iterator for PostOrderIterator<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            let node = self.arena.node(current);
            if visited {
                return Some((current, node));
            }
            self.stack.push((current, true));
            for &child in node.children.iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}
