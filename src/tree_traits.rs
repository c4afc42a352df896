use termtree::Tree;
use tracing::instrument;

use crate::arena::{NodeId, TreeArena};
use crate::token::Token;

/// Conversion of a subtree into a printable `termtree` view.
pub trait TreeNodeConvert {
    fn to_tree_string(&self, id: NodeId) -> Tree<String>;
}

impl<T: Token> TreeNodeConvert for TreeArena<T> {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, id: NodeId) -> Tree<String> {
        // Build bottom-up: finished subtrees wait on the stack for their parent
        let mut finished: Vec<Tree<String>> = Vec::new();

        for (_, node) in self.iter_postorder(id) {
            let value = node.value();
            let label = match value.error() {
                Some(err) => format!("{} [ERROR: {}]", value, err),
                None => value.to_string(),
            };
            let leaves = finished.split_off(finished.len() - node.children().len());
            finished.push(Tree::new(label).with_leaves(leaves));
        }

        finished
            .pop()
            .unwrap_or_else(|| Tree::new(self.value(id).to_string()))
    }
}
