use crate::{NodeId, QueueKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Events emitted while a director drives a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DirectorEvent {
    RunStarted {
        run_id: RunId,
        workflow: String,
        director: String,
        timestamp: DateTime<Utc>,
    },
    NodeTriggered {
        run_id: RunId,
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    PacketDelivered {
        run_id: RunId,
        from: String,
        to_node: NodeId,
        to_label: String,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        run_id: RunId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    RunHalted {
        run_id: RunId,
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    UnusedData {
        run_id: RunId,
        node_id: NodeId,
        label: String,
        kind: QueueKind,
        packets: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Cloneable handle for emitting events tagged with one run
#[derive(Clone)]
pub struct EventEmitter {
    run_id: RunId,
    sender: broadcast::Sender<DirectorEvent>,
}

impl EventEmitter {
    pub fn new(run_id: RunId, sender: broadcast::Sender<DirectorEvent>) -> Self {
        Self { run_id, sender }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Send an event; having no subscribers is not an error
    pub fn emit(&self, event: DirectorEvent) {
        let _ = self.sender.send(event);
    }

    pub fn node_triggered(&self, node_id: &NodeId) {
        self.emit(DirectorEvent::NodeTriggered {
            run_id: self.run_id,
            node_id: node_id.clone(),
            timestamp: Utc::now(),
        });
    }

    pub fn packet_delivered(&self, from: impl ToString, to_node: &NodeId, to_label: &str) {
        self.emit(DirectorEvent::PacketDelivered {
            run_id: self.run_id,
            from: from.to_string(),
            to_node: to_node.clone(),
            to_label: to_label.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn node_failed(&self, node_id: &NodeId, error: impl ToString) {
        self.emit(DirectorEvent::NodeFailed {
            run_id: self.run_id,
            node_id: node_id.clone(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn run_halted(&self, node_id: &NodeId) {
        self.emit(DirectorEvent::RunHalted {
            run_id: self.run_id,
            node_id: node_id.clone(),
            timestamp: Utc::now(),
        });
    }
}

/// Broadcast channel shared by a director and its observers
pub struct EventBus {
    sender: broadcast::Sender<DirectorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DirectorEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: DirectorEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(&self, run_id: RunId) -> EventEmitter {
        EventEmitter::new(run_id, self.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
