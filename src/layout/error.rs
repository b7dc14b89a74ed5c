use thiserror::Error;

/// Malformed input that makes a derivation pass impossible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("relationship {relationship_id:?} references unknown node {node_id:?}")]
    DanglingRelationship {
        relationship_id: String,
        node_id: String,
    },
    #[error("node id {node_id:?} is used more than once")]
    DuplicateNode { node_id: String },
    #[error("relationship id {relationship_id:?} is used more than once")]
    DuplicateRelationship { relationship_id: String },
}

impl LayoutError {
    /// Id of the element the error is about.
    pub fn offending_id(&self) -> &str {
        match self {
            LayoutError::DanglingRelationship {
                relationship_id, ..
            } => relationship_id,
            LayoutError::DuplicateNode { node_id } => node_id,
            LayoutError::DuplicateRelationship { relationship_id } => relationship_id,
        }
    }
}
