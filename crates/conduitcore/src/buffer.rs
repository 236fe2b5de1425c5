use crate::{ChangedState, InflowQueue, NodeError, NodeId, Outflow, OutflowSlot, Packet, WorkflowNode};

pub const BUFFER_INPUT: &str = "input";
pub const BUFFER_OUTPUT: &str = "output";

/// Hidden node placed in front of an inflow so packets can wait there
/// between scheduling passes.
///
/// Accepts every packet until one end-of-stream marker per upstream
/// outflow has arrived, and releases the queue head whenever its own
/// outflow is empty.
#[derive(Debug)]
pub struct BufferNode {
    id: NodeId,
    buffered_node: NodeId,
    buffered_label: String,
    expected_eos: usize,
    received_eos: usize,
    queue: InflowQueue,
    output: OutflowSlot,
    eos_sent: bool,
}

impl BufferNode {
    /// Buffer for `label` on `buffered_node`, fed by `upstream_count` outflows
    pub fn hidden(buffered_node: NodeId, buffered_label: impl Into<String>, upstream_count: usize) -> Self {
        let buffered_label = buffered_label.into();
        let id = NodeId::new(format!("BufferNode-for-{}-{}", buffered_node, buffered_label));
        Self {
            id,
            queue: InflowQueue::new(buffered_node.clone(), buffered_label.clone()),
            buffered_node,
            buffered_label,
            expected_eos: upstream_count.max(1),
            received_eos: 0,
            output: OutflowSlot::new(),
            eos_sent: false,
        }
    }

    pub fn buffered_node(&self) -> &NodeId {
        &self.buffered_node
    }

    pub fn buffered_inflow_label(&self) -> &str {
        &self.buffered_label
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_contents(&self) -> Vec<Packet> {
        self.queue.contents()
    }

    fn check_label(&self, label: &str, expected: &str) -> Result<(), NodeError> {
        if label == expected {
            Ok(())
        } else {
            Err(NodeError::UnknownPort {
                node: self.id.to_string(),
                label: label.to_string(),
            })
        }
    }
}

impl WorkflowNode for BufferNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn input_labels(&self) -> Vec<String> {
        vec![BUFFER_INPUT.to_string()]
    }

    fn output_labels(&self) -> Vec<String> {
        vec![BUFFER_OUTPUT.to_string()]
    }

    fn is_hidden(&self) -> bool {
        true
    }

    fn initialize(&mut self) -> Result<(), NodeError> {
        self.received_eos = 0;
        self.queue.clear();
        self.output.clear();
        self.eos_sent = false;
        Ok(())
    }

    fn ready_for_input_packet(&self, label: &str) -> bool {
        label == BUFFER_INPUT && self.received_eos < self.expected_eos
    }

    fn set_input_packet(&mut self, label: &str, packet: Packet) -> Result<(), NodeError> {
        self.check_label(label, BUFFER_INPUT)?;
        if packet.is_end_of_stream() {
            self.received_eos += 1;
            // only the last marker travels on; earlier ones just close a source
            if self.received_eos < self.expected_eos {
                return Ok(());
            }
        }
        self.queue.push(packet);
        Ok(())
    }

    fn trigger(&mut self) -> Result<ChangedState, NodeError> {
        if self.eos_sent || self.output.packet_ready() {
            return Ok(ChangedState::Unchanged);
        }
        match self.queue.pop() {
            Some(packet) => {
                if packet.is_end_of_stream() {
                    self.eos_sent = true;
                }
                tracing::trace!("{} released {}", self.id, packet);
                self.output.send(packet);
                Ok(ChangedState::Changed)
            }
            None => Ok(ChangedState::Unchanged),
        }
    }

    fn packet_ready(&self, label: &str) -> bool {
        label == BUFFER_OUTPUT && self.output.packet_ready()
    }

    fn output_packet(&mut self, label: &str) -> Result<Packet, NodeError> {
        self.check_label(label, BUFFER_OUTPUT)?;
        let outflow = Outflow::new(self.id.clone(), BUFFER_OUTPUT);
        self.output.take(&outflow)
    }

    fn peek_output_packet(&self, label: &str) -> Option<Packet> {
        if label == BUFFER_OUTPUT {
            self.output.peek().cloned()
        } else {
            None
        }
    }

    fn clear_outflows(&mut self) {
        self.output.clear();
    }

    fn is_node_finished(&self) -> bool {
        self.eos_sent
    }

    fn all_eos_received(&self) -> bool {
        self.received_eos >= self.expected_eos
    }

    fn all_eos_sent(&self) -> bool {
        self.eos_sent
    }
}
