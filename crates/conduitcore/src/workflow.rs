use crate::buffer::{BUFFER_INPUT, BUFFER_OUTPUT};
use crate::{Inflow, InflowToOutflowsMap, NodeId, Outflow, SharedNode, WorkflowError};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::BTreeMap;
use uuid::Uuid;

pub type WorkflowId = Uuid;

/// A dataflow graph: nodes in declaration order plus the fan-in table
/// binding every inflow to the outflows that feed it.
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    nodes: Vec<SharedNode>,
    index: BTreeMap<NodeId, usize>,
    bindings: InflowToOutflowsMap,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            nodes: Vec::new(),
            index: BTreeMap::new(),
            bindings: InflowToOutflowsMap::new(),
        }
    }

    /// Add a node, keyed by its name
    pub fn add_node(&mut self, node: SharedNode) -> Result<NodeId, WorkflowError> {
        let id = node.lock().id().clone();
        if self.index.contains_key(&id) {
            return Err(WorkflowError::DuplicateNode(id.to_string()));
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }

    /// Bind an output port of one node to an input port of another.
    ///
    /// Ports are only checked by [`Workflow::validate`], so connections may
    /// be declared before their nodes are added.
    pub fn connect(
        &mut self,
        from_node: impl Into<NodeId>,
        from_port: impl AsRef<str>,
        to_node: impl Into<NodeId>,
        to_port: impl AsRef<str>,
    ) {
        let outflow = Outflow::new(from_node, from_port);
        let inflow = Inflow::new(to_node, to_port);
        self.bindings.bind(inflow, outflow);
    }

    pub fn find_node(&self, id: &NodeId) -> Option<&SharedNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Nodes in declaration order, followed by any inserted nodes
    pub fn nodes(&self) -> &[SharedNode] {
        &self.nodes
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.lock().id().clone()).collect()
    }

    pub fn inflow_to_outflows_map(&self) -> &InflowToOutflowsMap {
        &self.bindings
    }

    /// Check that every binding names real ports and every inflow is fed
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for (inflow, outflows) in self.bindings.iter() {
            self.check_port(inflow.node(), inflow.label(), "input")?;
            for outflow in outflows {
                self.check_port(outflow.node(), outflow.label(), "output")?;
            }
        }

        for node in &self.nodes {
            let inflows = node.lock().inflows();
            for inflow in inflows {
                if self.bindings.outflows_for(&inflow).is_empty() {
                    return Err(WorkflowError::UnboundInflow {
                        node: inflow.node().to_string(),
                        label: inflow.label().to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_port(&self, id: &NodeId, label: &str, direction: &'static str) -> Result<(), WorkflowError> {
        let node = self
            .find_node(id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;
        let node = node.lock();
        let labels = if direction == "input" {
            node.input_labels()
        } else {
            node.output_labels()
        };
        if labels.iter().any(|l| l == label) {
            Ok(())
        } else {
            Err(WorkflowError::UnknownPort {
                node: id.to_string(),
                direction,
                label: label.to_string(),
            })
        }
    }

    /// Node-level dependency graph, one vertex per node in list order
    pub fn graph(&self) -> Result<DiGraph<NodeId, ()>, WorkflowError> {
        let mut graph = DiGraph::new();
        let mut node_to_index: BTreeMap<NodeId, NodeIndex> = BTreeMap::new();

        for node in &self.nodes {
            let id = node.lock().id().clone();
            let idx = graph.add_node(id.clone());
            node_to_index.insert(id, idx);
        }

        for (inflow, outflows) in self.bindings.iter() {
            let to_idx = node_to_index
                .get(inflow.node())
                .ok_or_else(|| WorkflowError::NodeNotFound(inflow.node().to_string()))?;
            for outflow in outflows {
                let from_idx = node_to_index
                    .get(outflow.node())
                    .ok_or_else(|| WorkflowError::NodeNotFound(outflow.node().to_string()))?;
                graph.update_edge(*from_idx, *to_idx, ());
            }
        }

        Ok(graph)
    }

    /// Nodes with no downstream consumers, in node list order
    pub fn sinks(&self) -> Result<Vec<NodeId>, WorkflowError> {
        let graph = self.graph()?;
        let mut sinks: Vec<NodeIndex> = graph.externals(Direction::Outgoing).collect();
        sinks.sort();
        Ok(sinks.into_iter().map(|idx| graph[idx].clone()).collect())
    }

    /// Splice `node` in front of `inflow`.
    ///
    /// The outflows that fed `inflow` are rebound to the node's `input`
    /// port, and `inflow` is rebound to the node's `output` port.
    pub fn insert_node_before_inflow(&mut self, node: SharedNode, inflow: &Inflow) -> Result<NodeId, WorkflowError> {
        {
            let guard = node.lock();
            let inputs = guard.input_labels();
            let outputs = guard.output_labels();
            if inputs != [BUFFER_INPUT] || outputs != [BUFFER_OUTPUT] {
                return Err(WorkflowError::InvalidBufferNode(format!(
                    "{} must have exactly one '{}' and one '{}' port",
                    guard.id(),
                    BUFFER_INPUT,
                    BUFFER_OUTPUT
                )));
            }
        }

        let outflows = self.bindings.remove(inflow).ok_or_else(|| WorkflowError::UnboundInflow {
            node: inflow.node().to_string(),
            label: inflow.label().to_string(),
        })?;

        let id = match self.add_node(node) {
            Ok(id) => id,
            Err(e) => {
                for outflow in outflows {
                    self.bindings.bind(inflow.clone(), outflow);
                }
                return Err(e);
            }
        };

        let buffer_input = Inflow::new(id.clone(), BUFFER_INPUT);
        for outflow in outflows {
            self.bindings.bind(buffer_input.clone(), outflow);
        }
        self.bindings.bind(inflow.clone(), Outflow::new(id.clone(), BUFFER_OUTPUT));

        tracing::debug!("Inserted {} before {}", id, inflow);
        Ok(id)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("nodes", &self.index.keys().collect::<Vec<_>>())
            .field("bindings", &self.bindings)
            .finish()
    }
}
