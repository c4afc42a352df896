use thiserror::Error;

use crate::arena::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0} does not exist in this arena")]
    StaleNode(NodeId),

    #[error("Node {0} cannot become its own child")]
    SelfAdoption(NodeId),
}

pub type TreeResult<T> = Result<T, TreeError>;
