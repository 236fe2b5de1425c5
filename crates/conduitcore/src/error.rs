use thiserror::Error;

/// Failure raised by a node's own computation or port handling.
///
/// Kept `Clone + Send` so a failure captured on a worker thread can be
/// handed back to the thread that joins it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Node {node} has no port labelled '{label}'")]
    UnknownPort { node: String, label: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Request for packet on empty outflow '{label}' on node {node}")]
    EmptyOutflow { node: String, label: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node {node} has no {direction} port labelled '{label}'")]
    UnknownPort {
        node: String,
        direction: &'static str,
        label: String,
    },

    #[error("Inflow '{label}' on node {node} is not bound to any outflow")]
    UnboundInflow { node: String, label: String },

    #[error("Invalid buffer node: {0}")]
    InvalidBufferNode(String),
}
