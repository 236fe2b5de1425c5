use crate::{Inflow, NodeError, NodeId, Outflow, Packet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Whether a trigger attempt changed the node's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangedState {
    Changed,
    Unchanged,
}

impl ChangedState {
    pub fn changed(self) -> bool {
        matches!(self, ChangedState::Changed)
    }
}

impl From<bool> for ChangedState {
    fn from(changed: bool) -> Self {
        if changed {
            ChangedState::Changed
        } else {
            ChangedState::Unchanged
        }
    }
}

/// Graph vertex as seen by a director.
///
/// How a node computes is its own business; directors only stage input
/// packets, ask it to fire, and collect what it left in its outflows.
pub trait WorkflowNode: Send {
    fn id(&self) -> &NodeId;

    /// Labels of the node's input ports
    fn input_labels(&self) -> Vec<String>;

    /// Labels of the node's output ports
    fn output_labels(&self) -> Vec<String>;

    /// Nodes inserted by a director rather than declared by the workflow
    fn is_hidden(&self) -> bool {
        false
    }

    /// Ask the node to finish after its first step. Nodes that cannot
    /// honor this ignore it.
    fn set_steps_once(&mut self, _steps_once: bool) {}

    fn steps_once(&self) -> bool {
        false
    }

    /// Upper bound on triggers started but not yet finished
    fn max_concurrent_steps(&self) -> usize {
        1
    }

    /// Reset all run state so the node can be driven again
    fn initialize(&mut self) -> Result<(), NodeError>;

    fn ready_for_input_packet(&self, label: &str) -> bool;

    fn set_input_packet(&mut self, label: &str, packet: Packet) -> Result<(), NodeError>;

    /// Fire once if the node has what it needs
    fn trigger(&mut self) -> Result<ChangedState, NodeError>;

    /// First half of a split trigger, used when firing and publishing run
    /// on different threads
    fn start_trigger(&mut self) -> Result<ChangedState, NodeError> {
        self.trigger()
    }

    /// Second half of a split trigger
    fn finish_trigger(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// True when the given outflow holds a packet nobody has taken yet
    fn packet_ready(&self, label: &str) -> bool;

    /// True when at least one outflow holds a packet waiting to be published
    fn outputs_ready(&self) -> bool {
        self.output_labels().iter().any(|label| self.packet_ready(label))
    }

    /// Take the packet held by an outflow
    fn output_packet(&mut self, label: &str) -> Result<Packet, NodeError>;

    /// Look at the packet held by an outflow without taking it
    fn peek_output_packet(&self, label: &str) -> Option<Packet>;

    /// Drop whatever every outflow holds
    fn clear_outflows(&mut self);

    fn is_node_finished(&self) -> bool;

    fn all_eos_received(&self) -> bool;

    fn all_eos_sent(&self) -> bool;

    fn inflows(&self) -> Vec<Inflow> {
        self.input_labels()
            .iter()
            .map(|label| Inflow::new(self.id().clone(), label))
            .collect()
    }

    fn outflows(&self) -> Vec<Outflow> {
        self.output_labels()
            .iter()
            .map(|label| Outflow::new(self.id().clone(), label))
            .collect()
    }
}

/// Handle through which the graph and its directors share a node
pub type SharedNode = Arc<Mutex<dyn WorkflowNode>>;

/// Wrap a node so it can be added to a workflow
pub fn shared<N: WorkflowNode + 'static>(node: N) -> SharedNode {
    Arc::new(Mutex::new(node))
}
