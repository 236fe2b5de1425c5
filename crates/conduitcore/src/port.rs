use crate::{NodeError, Packet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Identity of a workflow node.
///
/// Nodes are keyed by name, so every map keyed on a node iterates in the
/// same order on every run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(name: impl AsRef<str>) -> Self {
        NodeId(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        NodeId::new(name)
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        NodeId(Arc::from(name))
    }
}

/// Source port: a producing node and one of its output labels.
///
/// Ordered by owning node first so publish fan-out is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outflow {
    node: NodeId,
    label: Arc<str>,
}

impl Outflow {
    pub fn new(node: impl Into<NodeId>, label: impl AsRef<str>) -> Self {
        Self {
            node: node.into(),
            label: Arc::from(label.as_ref()),
        }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Outflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.label)
    }
}

/// Sink port: a consuming node and one of its input labels
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Inflow {
    node: NodeId,
    label: Arc<str>,
}

impl Inflow {
    pub fn new(node: impl Into<NodeId>, label: impl AsRef<str>) -> Self {
        Self {
            node: node.into(),
            label: Arc::from(label.as_ref()),
        }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Inflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.label)
    }
}

/// Fan-in table: every inflow of the graph with the outflows feeding it,
/// in binding order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InflowToOutflowsMap {
    bindings: BTreeMap<Inflow, Vec<Outflow>>,
}

impl InflowToOutflowsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `outflow` as an additional source of `inflow`.
    /// Binding the same pair twice is a no-op.
    pub fn bind(&mut self, inflow: Inflow, outflow: Outflow) {
        let outflows = self.bindings.entry(inflow).or_default();
        if !outflows.contains(&outflow) {
            outflows.push(outflow);
        }
    }

    pub fn get(&self, inflow: &Inflow) -> Option<&[Outflow]> {
        self.bindings.get(inflow).map(Vec::as_slice)
    }

    /// Outflows feeding `inflow`, empty when it is unbound
    pub fn outflows_for(&self, inflow: &Inflow) -> &[Outflow] {
        self.get(inflow).unwrap_or(&[])
    }

    pub fn contains(&self, inflow: &Inflow) -> bool {
        self.bindings.contains_key(inflow)
    }

    pub(crate) fn remove(&mut self, inflow: &Inflow) -> Option<Vec<Outflow>> {
        self.bindings.remove(inflow)
    }

    pub fn inflows(&self) -> impl Iterator<Item = &Inflow> {
        self.bindings.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Inflow, &[Outflow])> {
        self.bindings.iter().map(|(inflow, outflows)| (inflow, outflows.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Single-slot holder behind one outflow of a node.
///
/// Sending overwrites whatever is held; readers either peek (leaving the
/// packet in place) or take it, which clears the ready flag.
#[derive(Debug, Clone, Default)]
pub struct OutflowSlot {
    packet: Option<Packet>,
}

impl OutflowSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, packet: Packet) {
        self.packet = Some(packet);
    }

    pub fn packet_ready(&self) -> bool {
        self.packet.is_some()
    }

    pub fn peek(&self) -> Option<&Packet> {
        self.packet.as_ref()
    }

    /// Remove and return the held packet
    pub fn take(&mut self, outflow: &Outflow) -> Result<Packet, NodeError> {
        self.packet.take().ok_or_else(|| NodeError::EmptyOutflow {
            node: outflow.node().to_string(),
            label: outflow.label().to_string(),
        })
    }

    pub fn clear(&mut self) {
        self.packet = None;
    }
}

/// FIFO of packets waiting to reach one (node, label) pair
#[derive(Debug, Clone)]
pub struct InflowQueue {
    node: NodeId,
    label: String,
    packets: VecDeque<Packet>,
}

impl InflowQueue {
    pub fn new(node: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            label: label.into(),
            packets: VecDeque::new(),
        }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn push(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    pub fn pop(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }

    pub fn front(&self) -> Option<&Packet> {
        self.packets.front()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }

    /// Copy of the queued packets in arrival order
    pub fn contents(&self) -> Vec<Packet> {
        self.packets.iter().cloned().collect()
    }
}
