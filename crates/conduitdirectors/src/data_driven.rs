use crate::{
    Director, DirectorConfig, DirectorCore, DirectorError, DirectorKind, DirectorState, OutflowSubscriptions, Result,
};
use conduitcore::{
    BufferNode, EventEmitter, Inflow, Outflow, QueueKind, SharedNode, UnusedDataRecord, WorkflowNode, WrapupResult,
    BUFFER_OUTPUT,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Polling policy that publishes an output only when every subscriber can
/// take it at once.
///
/// Elaboration puts a hidden [`BufferNode`] in front of every inflow so
/// packets can wait between passes; this rewrite is why elaboration takes
/// two calls.
pub struct DataDrivenDirector {
    core: DirectorCore,
    subscriptions: OutflowSubscriptions,
    buffers: Vec<Arc<Mutex<BufferNode>>>,
}

impl DataDrivenDirector {
    pub fn new() -> Self {
        Self::with_config(DirectorConfig::default())
    }

    pub fn with_config(config: DirectorConfig) -> Self {
        Self {
            core: DirectorCore::new(config),
            subscriptions: OutflowSubscriptions::new(),
            buffers: Vec::new(),
        }
    }

    pub fn set_insert_buffer_nodes(&mut self, insert: bool) -> Result<()> {
        self.core.require_properties_phase("set_insert_buffer_nodes")?;
        self.core.config_mut().insert_buffer_nodes = insert;
        Ok(())
    }

    pub fn buffer_nodes(&self) -> &[Arc<Mutex<BufferNode>>] {
        &self.buffers
    }

    fn insert_buffer_nodes(&mut self) -> Result<()> {
        let workflow = self.core.begin_elaborate()?;
        let mut inflows: Vec<(Inflow, usize)> = workflow
            .inflow_to_outflows_map()
            .iter()
            .map(|(inflow, outflows)| (inflow.clone(), outflows.len()))
            .collect();
        inflows.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut buffers = Vec::with_capacity(inflows.len());
        for (inflow, upstream_count) in inflows {
            let buffer = Arc::new(Mutex::new(BufferNode::hidden(
                inflow.node().clone(),
                inflow.label(),
                upstream_count,
            )));
            let node: SharedNode = buffer.clone();
            workflow.insert_node_before_inflow(node, &inflow)?;
            buffers.push(buffer);
        }
        tracing::debug!("Inserted {} buffer nodes", buffers.len());
        self.buffers = buffers;
        Ok(())
    }

    /// Hand the packet on `outflow` to all of its subscribers, or to none.
    /// Returns whether the packet left the outflow.
    fn publish_all_or_nothing(&self, producer: &SharedNode, outflow: &Outflow, emitter: &EventEmitter) -> Result<bool> {
        let subscribers = self.subscriptions.find_all_node_inputs_bound_to_outflow(outflow);
        if subscribers.is_empty() {
            let packet = producer
                .lock()
                .output_packet(outflow.label())
                .map_err(|e| DirectorError::node_failed(outflow.node(), e))?;
            tracing::trace!("Discarding {} from {}, nothing subscribes to it", packet, outflow);
            return Ok(true);
        }

        let all_ready = subscribers
            .iter()
            .all(|input| input.node.lock().ready_for_input_packet(&input.label));
        if !all_ready {
            return Ok(false);
        }

        let packet = producer
            .lock()
            .output_packet(outflow.label())
            .map_err(|e| DirectorError::node_failed(outflow.node(), e))?;
        for input in subscribers {
            tracing::trace!("Delivering {} from {} to {}.{}", packet, outflow, input.id, input.label);
            input
                .node
                .lock()
                .set_input_packet(&input.label, packet.clone())
                .map_err(|e| DirectorError::node_failed(&input.id, e))?;
            emitter.packet_delivered(outflow, &input.id, &input.label);
        }
        Ok(true)
    }

    fn step(&self, node: &SharedNode, emitter: &EventEmitter) -> Result<bool> {
        let (id, changed, ready_outflows) = {
            let mut guard = node.lock();
            let id = guard.id().clone();
            let changed = match guard.trigger() {
                Ok(changed) => changed.changed(),
                Err(e) => {
                    tracing::error!("Node {} failed: {}", id, e);
                    emitter.node_failed(&id, &e);
                    return Err(DirectorError::node_failed(&id, e));
                }
            };
            let ready: Vec<Outflow> = guard
                .outflows()
                .into_iter()
                .filter(|outflow| guard.packet_ready(outflow.label()))
                .collect();
            (id, changed, ready)
        };

        let mut progress = changed;
        if changed {
            tracing::trace!("Triggered {}", id);
            emitter.node_triggered(&id);
        }
        for outflow in &ready_outflows {
            if self.publish_all_or_nothing(node, outflow, emitter)? {
                progress = true;
            }
        }
        Ok(progress)
    }

    fn run_to_fixed_point(&self, emitter: &EventEmitter) -> Result<()> {
        let nodes = self.core.nodes();
        let mut passes = 0usize;
        loop {
            let mut progress = false;
            for node in nodes {
                if self.step(node, emitter)? {
                    progress = true;
                }
            }
            passes += 1;
            if !progress {
                break;
            }
        }
        tracing::debug!("Data-driven run settled after {} passes", passes);
        Ok(())
    }
}

impl Default for DataDrivenDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl Director for DataDrivenDirector {
    fn kind(&self) -> DirectorKind {
        DirectorKind::DataDriven
    }

    fn core(&self) -> &DirectorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DirectorCore {
        &mut self.core
    }

    fn elaborate(&mut self) -> Result<bool> {
        let first_pass = self.core.state() != DirectorState::Modified;
        if first_pass && self.core.config().insert_buffer_nodes {
            self.insert_buffer_nodes()?;
            self.core.mark_modified();
            return Ok(true);
        }

        self.core.begin_elaborate()?;
        self.core.capture_graph()?;
        self.subscriptions = OutflowSubscriptions::build(self.core.inflow_to_outflows_map(), self.core.node_index())?;
        Ok(false)
    }

    fn run(&mut self) -> Result<()> {
        let emitter = self.core.begin_run(self.kind())?;
        let outcome = self.run_to_fixed_point(&emitter);
        self.core.finish_run(outcome)
    }

    fn wrapup(&mut self) -> Result<WrapupResult> {
        self.core.begin_wrapup()?;

        let mut records = Vec::new();
        for buffer in &self.buffers {
            let buffer = buffer.lock();
            // a packet already released but not yet taken is still ahead of the queue
            let mut packets: Vec<_> = buffer.peek_output_packet(BUFFER_OUTPUT).into_iter().collect();
            packets.extend(buffer.queue_contents());
            records.push(UnusedDataRecord::new(
                buffer.buffered_node().clone(),
                buffer.buffered_inflow_label(),
                QueueKind::Buffer,
                packets,
            ));
        }

        for node in self.core.nodes() {
            let node = node.lock();
            if node.is_hidden() {
                continue;
            }
            for outflow in node.outflows() {
                if let Some(packet) = node.peek_output_packet(outflow.label()) {
                    if self.subscriptions.has_subscribers(&outflow) {
                        records.push(UnusedDataRecord::new(
                            outflow.node().clone(),
                            outflow.label(),
                            QueueKind::Outflow,
                            vec![packet],
                        ));
                    }
                }
            }
        }

        self.core.finish_wrapup(WrapupResult::new(records))
    }
}
