use crate::{DirectorError, Result};
use conduitcore::{InflowToOutflowsMap, NodeId, Outflow, SharedNode};
use std::collections::BTreeMap;

/// One (node, input label) pair subscribed to an outflow
#[derive(Clone)]
pub struct NodeInput {
    pub node: SharedNode,
    pub id: NodeId,
    pub label: String,
}

impl std::fmt::Debug for NodeInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.id, self.label)
    }
}

/// Index from each outflow to every node input bound to it.
///
/// Built once per elaboration by inverting the fan-in map; subscribers of
/// an outflow are listed in inflow order.
#[derive(Debug, Clone, Default)]
pub struct OutflowSubscriptions {
    subscribers: BTreeMap<Outflow, Vec<NodeInput>>,
}

impl OutflowSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(fan_in: &InflowToOutflowsMap, nodes: &BTreeMap<NodeId, SharedNode>) -> Result<Self> {
        let mut subscriptions = Self::new();
        for (inflow, outflows) in fan_in.iter() {
            let node = nodes.get(inflow.node()).ok_or_else(|| {
                DirectorError::Configuration(format!("inflow {} belongs to an unknown node", inflow))
            })?;
            for outflow in outflows {
                subscriptions.subscribe(outflow.clone(), node.clone(), inflow.node().clone(), inflow.label());
            }
        }
        Ok(subscriptions)
    }

    pub fn subscribe(&mut self, outflow: Outflow, node: SharedNode, id: NodeId, label: &str) {
        self.subscribers.entry(outflow).or_default().push(NodeInput {
            node,
            id,
            label: label.to_string(),
        });
    }

    pub fn find_all_node_inputs_bound_to_outflow(&self, outflow: &Outflow) -> &[NodeInput] {
        self.subscribers.get(outflow).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_subscribers(&self, outflow: &Outflow) -> bool {
        !self.find_all_node_inputs_bound_to_outflow(outflow).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Outflow, &[NodeInput])> {
        self.subscribers.iter().map(|(outflow, inputs)| (outflow, inputs.as_slice()))
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}
