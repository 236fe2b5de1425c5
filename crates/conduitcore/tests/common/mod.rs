#![allow(dead_code)]

use conduitcore::{ChangedState, NodeError, NodeId, Outflow, OutflowSlot, Packet, WorkflowNode};
use std::collections::BTreeMap;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Minimal node with fixed port labels that forwards nothing
pub struct StubNode {
    id: NodeId,
    inputs: Vec<String>,
    outputs: BTreeMap<String, OutflowSlot>,
}

impl StubNode {
    pub fn new(name: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            id: NodeId::new(name),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| (s.to_string(), OutflowSlot::new())).collect(),
        }
    }
}

impl WorkflowNode for StubNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn input_labels(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_labels(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }

    fn initialize(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    fn ready_for_input_packet(&self, _label: &str) -> bool {
        false
    }

    fn set_input_packet(&mut self, _label: &str, _packet: Packet) -> Result<(), NodeError> {
        Ok(())
    }

    fn trigger(&mut self) -> Result<ChangedState, NodeError> {
        Ok(ChangedState::Unchanged)
    }

    fn packet_ready(&self, label: &str) -> bool {
        self.outputs.get(label).map(|s| s.packet_ready()).unwrap_or(false)
    }

    fn output_packet(&mut self, label: &str) -> Result<Packet, NodeError> {
        let outflow = Outflow::new(self.id.clone(), label);
        match self.outputs.get_mut(label) {
            Some(slot) => slot.take(&outflow),
            None => Err(NodeError::UnknownPort {
                node: self.id.to_string(),
                label: label.to_string(),
            }),
        }
    }

    fn peek_output_packet(&self, label: &str) -> Option<Packet> {
        self.outputs.get(label).and_then(|s| s.peek().cloned())
    }

    fn clear_outflows(&mut self) {
        for slot in self.outputs.values_mut() {
            slot.clear();
        }
    }

    fn is_node_finished(&self) -> bool {
        false
    }

    fn all_eos_received(&self) -> bool {
        false
    }

    fn all_eos_sent(&self) -> bool {
        false
    }
}
