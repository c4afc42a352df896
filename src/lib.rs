//! Mutable, ordered token trees for single-pass scanners and parsers.
//!
//! A [`TreeArena`] owns every node; nodes are addressed by [`NodeId`] and
//! carry a [`Token`]. Besides appending children, a node can be wrapped by a
//! node created later with [`TreeArena::push`], which splices the new node
//! into the old one's position:
//!
//! ```text
//! A(B)   push(B, C)   A(C(B))
//! ```

pub mod arena;
pub mod errors;
pub mod token;
pub mod tree_traits;
pub mod util;

pub use arena::{NodeDisplay, NodeId, PostOrderIterator, TreeArena, TreeIterator, TreeNode};
pub use errors::{TreeError, TreeResult};
pub use token::Token;
pub use tree_traits::TreeNodeConvert;
