use serde::{Deserialize, Serialize};

/// What a director does when an operation is called in the wrong state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractPolicy {
    /// Reject the call with [`crate::DirectorError::Precondition`]
    Enforce,
    /// Log the violation and carry on
    Log,
}

impl Default for ContractPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ContractPolicy::Enforce
        } else {
            ContractPolicy::Log
        }
    }
}

/// Settings shared by every director policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    pub contract_policy: ContractPolicy,
    /// Rounds run by the demand-driven policy
    pub firing_count: usize,
    /// Whether the data-driven policy buffers every inflow
    pub insert_buffer_nodes: bool,
    pub event_buffer_size: usize,
    /// Stack size of multithreaded worker threads, platform default when unset
    pub worker_stack_size: Option<usize>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            contract_policy: ContractPolicy::default(),
            firing_count: 1,
            insert_buffer_nodes: true,
            event_buffer_size: 1000,
            worker_stack_size: None,
        }
    }
}
