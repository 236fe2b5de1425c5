use crate::HaltSignal;
use conduitcore::{EventEmitter, NodeError, NodeId, Packet, SharedNode};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A packet addressed to one input label of a node
#[derive(Debug, Clone)]
pub struct Delivery {
    pub label: String,
    pub packet: Packet,
}

/// Packets a producer still held for its node when it stopped
#[derive(Debug, Default)]
pub struct ProducerReport {
    pub node: Option<NodeId>,
    pub queued: BTreeMap<String, Vec<Packet>>,
}

/// Input side of a node's worker pair.
///
/// Owns the node's input queues, feeds them into the node, and starts
/// triggers while fewer than the node's concurrency limit are in flight.
/// Each started trigger is announced to the paired consumer, which
/// answers on `completions` once it has published the outputs.
pub struct TriggerProducer {
    id: NodeId,
    node: SharedNode,
    inbox: mpsc::UnboundedReceiver<Delivery>,
    started: mpsc::UnboundedSender<()>,
    completions: mpsc::UnboundedReceiver<()>,
    queues: BTreeMap<String, VecDeque<Packet>>,
    active: usize,
    halt: Arc<HaltSignal>,
    emitter: EventEmitter,
}

enum Stop {
    Finished,
    Drained,
    Halted,
}

impl TriggerProducer {
    pub fn new(
        node: SharedNode,
        inbox: mpsc::UnboundedReceiver<Delivery>,
        started: mpsc::UnboundedSender<()>,
        completions: mpsc::UnboundedReceiver<()>,
        halt: Arc<HaltSignal>,
        emitter: EventEmitter,
    ) -> Self {
        let id = node.lock().id().clone();
        Self {
            id,
            node,
            inbox,
            started,
            completions,
            queues: BTreeMap::new(),
            active: 0,
            halt,
            emitter,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    fn fail(&self, error: NodeError) -> Stop {
        self.emitter.node_failed(&self.id, &error);
        if self.halt.halt(&self.id, error) {
            self.emitter.run_halted(&self.id);
        }
        Stop::Halted
    }

    fn enqueue(&mut self, delivery: Delivery) {
        tracing::trace!("{} queued {} on '{}'", self.id, delivery.packet, delivery.label);
        self.queues.entry(delivery.label).or_default().push_back(delivery.packet);
    }

    fn absorb_completions(&mut self) {
        while self.completions.try_recv().is_ok() {
            self.active = self.active.saturating_sub(1);
        }
    }

    /// Move at most one packet per ready label into the node
    fn feed_inputs(&mut self) -> Result<bool, NodeError> {
        let mut node = self.node.lock();
        let mut fed = false;
        for (label, queue) in self.queues.iter_mut() {
            if queue.is_empty() || !node.ready_for_input_packet(label) {
                continue;
            }
            if let Some(packet) = queue.pop_front() {
                node.set_input_packet(label, packet)?;
                fed = true;
            }
        }
        Ok(fed)
    }

    async fn drive(&mut self) -> Stop {
        let mut inbox_open = true;
        loop {
            if self.halt.is_halted() {
                return Stop::Halted;
            }
            self.absorb_completions();

            let (done, max_steps) = {
                let node = self.node.lock();
                (node.is_node_finished() || node.all_eos_sent(), node.max_concurrent_steps().max(1))
            };

            if done {
                if self.active == 0 {
                    return Stop::Finished;
                }
            } else {
                if self.active < max_steps {
                    let started = self.node.lock().start_trigger();
                    match started {
                        Ok(changed) if changed.changed() => {
                            self.active += 1;
                            self.emitter.node_triggered(&self.id);
                            if self.started.send(()).is_err() {
                                return self.fail(NodeError::ExecutionFailed(format!(
                                    "consumer for {} exited early",
                                    self.id
                                )));
                            }
                            continue;
                        }
                        Ok(_) => {}
                        Err(e) => return self.fail(e),
                    }
                }

                match self.feed_inputs() {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(e) => return self.fail(e),
                }

                if !inbox_open && self.active == 0 {
                    return Stop::Drained;
                }
            }

            tokio::select! {
                biased;
                _ = self.halt.halted() => return Stop::Halted,
                completion = self.completions.recv(), if self.active > 0 => {
                    if completion.is_some() {
                        self.active -= 1;
                    } else {
                        self.active = 0;
                    }
                }
                delivery = self.inbox.recv(), if inbox_open && !done => match delivery {
                    Some(delivery) => self.enqueue(delivery),
                    None => inbox_open = false,
                },
            }
        }
    }

    /// Run until the node finishes, its inputs run dry, or the run halts
    pub async fn run(mut self) -> ProducerReport {
        tracing::debug!("Producer for {} started", self.id);
        let stop = self.drive().await;
        match stop {
            Stop::Finished => tracing::debug!("Producer for {} finished", self.id),
            Stop::Drained => tracing::debug!("Producer for {} has no more input", self.id),
            Stop::Halted => tracing::debug!("Producer for {} stopped by halt", self.id),
        }

        self.inbox.close();
        while let Ok(delivery) = self.inbox.try_recv() {
            self.enqueue(delivery);
        }

        ProducerReport {
            node: Some(self.id.clone()),
            queued: self
                .queues
                .into_iter()
                .map(|(label, queue)| (label, queue.into_iter().collect()))
                .collect(),
        }
    }
}
