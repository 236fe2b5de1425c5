use crate::{DirectorError, Result};
use conduitcore::{
    EventEmitter, InflowQueue, NodeId, Outflow, Packet, QueueKind, SharedNode, UnusedDataRecord, WrapupResult,
};
use std::collections::BTreeMap;

/// Separates producing a packet from delivering it to subscribers
pub trait Publisher: Send {
    /// Register `label` on `node` as a subscriber of `outflow`
    fn subscribe(&mut self, node: &SharedNode, label: &str, outflow: &Outflow);

    /// Queue `packet` for every subscriber of `outflow` and deliver to the
    /// ones ready for it
    fn publish(&mut self, outflow: &Outflow, packet: Packet) -> Result<()>;

    /// Deliver queued packets to `node` for every label it is ready on.
    /// Returns whether anything was delivered.
    fn flush_packet_to_node(&mut self, node: &SharedNode) -> Result<bool>;

    fn clear_packet_buffers(&mut self);

    /// Report every packet still queued
    fn wrapup(&self) -> WrapupResult;
}

struct Subscriber {
    node: SharedNode,
    queues: BTreeMap<String, InflowQueue>,
}

/// Publisher keeping one FIFO per (outflow, subscribing node, input label)
#[derive(Default)]
pub struct BufferedPublisher {
    subscribers: BTreeMap<Outflow, BTreeMap<NodeId, Subscriber>>,
    emitter: Option<EventEmitter>,
}

impl BufferedPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report deliveries on the given run's event stream
    pub fn attach_events(&mut self, emitter: EventEmitter) {
        self.emitter = Some(emitter);
    }

    pub fn has_subscribers(&self, outflow: &Outflow) -> bool {
        self.subscribers.get(outflow).map(|s| !s.is_empty()).unwrap_or(false)
    }

    /// Packets waiting for `label` on `node` from `outflow`
    pub fn queued(&self, outflow: &Outflow, node: &NodeId, label: &str) -> usize {
        self.subscribers
            .get(outflow)
            .and_then(|s| s.get(node))
            .and_then(|s| s.queues.get(label))
            .map(InflowQueue::len)
            .unwrap_or(0)
    }

    fn deliver_one(
        emitter: Option<&EventEmitter>,
        outflow: &Outflow,
        id: &NodeId,
        node: &SharedNode,
        queue: &mut InflowQueue,
    ) -> Result<bool> {
        let mut guard = node.lock();
        if queue.is_empty() || !guard.ready_for_input_packet(queue.label()) {
            return Ok(false);
        }
        let Some(packet) = queue.pop() else {
            return Ok(false);
        };
        tracing::trace!("Delivering {} from {} to {}.{}", packet, outflow, id, queue.label());
        guard
            .set_input_packet(queue.label(), packet)
            .map_err(|e| DirectorError::node_failed(id, e))?;
        if let Some(emitter) = emitter {
            emitter.packet_delivered(outflow, id, queue.label());
        }
        Ok(true)
    }
}

impl Publisher for BufferedPublisher {
    fn subscribe(&mut self, node: &SharedNode, label: &str, outflow: &Outflow) {
        let id = node.lock().id().clone();
        let subscriber = self
            .subscribers
            .entry(outflow.clone())
            .or_default()
            .entry(id.clone())
            .or_insert_with(|| Subscriber {
                node: node.clone(),
                queues: BTreeMap::new(),
            });
        subscriber
            .queues
            .entry(label.to_string())
            .or_insert_with(|| InflowQueue::new(id, label));
    }

    fn publish(&mut self, outflow: &Outflow, packet: Packet) -> Result<()> {
        let Some(subscribers) = self.subscribers.get_mut(outflow) else {
            tracing::trace!("Discarding {} from {}, nothing subscribes to it", packet, outflow);
            return Ok(());
        };

        for subscriber in subscribers.values_mut() {
            for queue in subscriber.queues.values_mut() {
                queue.push(packet.clone());
            }
        }

        let emitter = self.emitter.as_ref();
        for (id, subscriber) in subscribers.iter_mut() {
            for queue in subscriber.queues.values_mut() {
                Self::deliver_one(emitter, outflow, id, &subscriber.node, queue)?;
            }
        }
        Ok(())
    }

    fn flush_packet_to_node(&mut self, node: &SharedNode) -> Result<bool> {
        let id = node.lock().id().clone();
        let emitter = self.emitter.as_ref();
        let mut flushed = false;
        for (outflow, subscribers) in self.subscribers.iter_mut() {
            if let Some(subscriber) = subscribers.get_mut(&id) {
                for queue in subscriber.queues.values_mut() {
                    if Self::deliver_one(emitter, outflow, &id, &subscriber.node, queue)? {
                        flushed = true;
                    }
                }
            }
        }
        Ok(flushed)
    }

    fn clear_packet_buffers(&mut self) {
        for subscribers in self.subscribers.values_mut() {
            for subscriber in subscribers.values_mut() {
                for queue in subscriber.queues.values_mut() {
                    queue.clear();
                }
            }
        }
    }

    fn wrapup(&self) -> WrapupResult {
        let records = self.subscribers.values().flat_map(|subscribers| {
            subscribers.iter().flat_map(|(id, subscriber)| {
                subscriber.queues.values().map(move |queue| {
                    UnusedDataRecord::new(id.clone(), queue.label(), QueueKind::Queue, queue.contents())
                })
            })
        });
        WrapupResult::new(records)
    }
}
