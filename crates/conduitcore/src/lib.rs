//! Core abstractions for the conduit workflow engine
//!
//! This crate provides the graph model every director works against:
//! packets and ports, the node contract, the workflow graph and the
//! records a director produces when it wraps up a run.

mod buffer;
mod error;
pub mod events;
mod node;
mod packet;
mod port;
mod value;
mod workflow;
mod wrapup;

pub use buffer::{BufferNode, BUFFER_INPUT, BUFFER_OUTPUT};
pub use error::{NodeError, WorkflowError};
pub use events::{DirectorEvent, EventBus, EventEmitter, RunId};
pub use node::{shared, ChangedState, SharedNode, WorkflowNode};
pub use packet::{Packet, PacketId, DEFAULT_RESOURCE};
pub use port::{Inflow, InflowQueue, InflowToOutflowsMap, NodeId, Outflow, OutflowSlot};
pub use value::Value;
pub use workflow::{Workflow, WorkflowId};
pub use wrapup::{QueueKind, UnusedDataRecord, WrapupResult};
