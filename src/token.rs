//! Values carried by tree nodes.

use std::error::Error;
use std::fmt::Display;

/// A scanned or parsed value that can be held by a tree node.
///
/// `Display` provides the text used by [`crate::TreeArena::render`]. A token
/// that stands for a scan or parse failure reports it through
/// [`Token::error`]; rendering then shows the error in place of the node's
/// children. Value equality, where needed for lookup, comes from `PartialEq`.
pub trait Token: Display {
    fn error(&self) -> Option<&dyn Error> {
        None
    }
}

impl Token for String {}

impl Token for &str {}

impl Token for char {}
