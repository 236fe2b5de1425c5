use crate::DirectorState;
use conduitcore::{NodeError, NodeId, WorkflowError};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DirectorError {
    #[error("{operation} called in state {state}, expected one of {}", format_states(.expected))]
    Precondition {
        operation: &'static str,
        state: DirectorState,
        expected: Vec<DirectorState>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Node {node} failed: {source}")]
    NodeFailed {
        node: NodeId,
        #[source]
        source: NodeError,
    },

    #[error("Worker error: {0}")]
    Worker(String),
}

impl DirectorError {
    pub fn node_failed(node: &NodeId, source: NodeError) -> Self {
        DirectorError::NodeFailed {
            node: node.clone(),
            source,
        }
    }
}

fn format_states(states: &[DirectorState]) -> String {
    states.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ")
}

/// Result type for director operations
pub type Result<T> = std::result::Result<T, DirectorError>;
