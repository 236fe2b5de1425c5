use crate::director::take_ready_outputs;
use crate::{Delivery, DirectorError, HaltSignal};
use conduitcore::{EventEmitter, NodeError, NodeId, Packet, SharedNode};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Downstream producer inbox registered for one output label
#[derive(Debug, Clone)]
pub struct BroadcastTarget {
    pub node: NodeId,
    pub label: String,
    pub inbox: mpsc::UnboundedSender<Delivery>,
}

/// Packets a consumer could not hand to a downstream producer that had
/// already stopped, keyed by (node, input label)
#[derive(Debug, Default)]
pub struct ConsumerReport {
    pub undelivered: BTreeMap<(NodeId, String), Vec<Packet>>,
}

/// Output side of a node's worker pair.
///
/// For every trigger its producer started it finishes the trigger,
/// broadcasts the node's outputs to the downstream producers and reports
/// the completion back.
pub struct TriggerConsumer {
    id: NodeId,
    node: SharedNode,
    started: mpsc::UnboundedReceiver<()>,
    completions: mpsc::UnboundedSender<()>,
    targets: BTreeMap<String, Vec<BroadcastTarget>>,
    halt: Arc<HaltSignal>,
    emitter: EventEmitter,
    report: ConsumerReport,
}

impl TriggerConsumer {
    pub fn new(
        node: SharedNode,
        started: mpsc::UnboundedReceiver<()>,
        completions: mpsc::UnboundedSender<()>,
        halt: Arc<HaltSignal>,
        emitter: EventEmitter,
    ) -> Self {
        let id = node.lock().id().clone();
        Self {
            id,
            node,
            started,
            completions,
            targets: BTreeMap::new(),
            halt,
            emitter,
            report: ConsumerReport::default(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Send packets published on `output_label` to `label` on `node`
    pub fn register(&mut self, output_label: &str, node: NodeId, label: &str, inbox: mpsc::UnboundedSender<Delivery>) {
        self.targets.entry(output_label.to_string()).or_default().push(BroadcastTarget {
            node,
            label: label.to_string(),
            inbox,
        });
    }

    fn fail(&self, error: NodeError) {
        self.emitter.node_failed(&self.id, &error);
        if self.halt.halt(&self.id, error) {
            self.emitter.run_halted(&self.id);
        }
    }

    fn finish_and_broadcast(&mut self) -> Result<(), NodeError> {
        let finished = self.node.lock().finish_trigger();
        finished?;

        let outputs = take_ready_outputs(&self.node).map_err(|e| match e {
            DirectorError::NodeFailed { source, .. } => source,
            other => NodeError::ExecutionFailed(other.to_string()),
        })?;

        for (outflow, packet) in outputs {
            let Some(targets) = self.targets.get(outflow.label()) else {
                tracing::trace!("Discarding {} from {}, nothing subscribes to it", packet, outflow);
                continue;
            };
            for target in targets {
                let delivery = Delivery {
                    label: target.label.clone(),
                    packet: packet.clone(),
                };
                match target.inbox.send(delivery) {
                    Ok(()) => {
                        tracing::trace!("Sent {} from {} to {}.{}", packet, outflow, target.node, target.label);
                        self.emitter.packet_delivered(&outflow, &target.node, &target.label);
                    }
                    Err(mpsc::error::SendError(delivery)) => {
                        self.report
                            .undelivered
                            .entry((target.node.clone(), target.label.clone()))
                            .or_default()
                            .push(delivery.packet);
                    }
                }
            }
        }
        Ok(())
    }

    /// Run until the producer stops announcing triggers or the run halts
    pub async fn run(mut self) -> ConsumerReport {
        tracing::debug!("Consumer for {} started", self.id);
        loop {
            tokio::select! {
                biased;
                _ = self.halt.halted() => {
                    tracing::debug!("Consumer for {} stopped by halt", self.id);
                    break;
                }
                started = self.started.recv() => {
                    if started.is_none() {
                        tracing::debug!("Consumer for {} finished", self.id);
                        break;
                    }
                    if let Err(e) = self.finish_and_broadcast() {
                        self.fail(e);
                        break;
                    }
                    let _ = self.completions.send(());
                }
            }
        }
        self.report
    }
}
