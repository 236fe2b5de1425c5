//! Standard node library
//!
//! [`ActorNode`] adapts a step function to the node contract directors
//! drive; the actors here cover sources, merging, transforms and output.

mod actor;
mod merge;
mod printer;
mod source;
mod transform;

pub use actor::{Actor, ActorNode, ActorStatus, StepInputs, StepOutput};
pub use merge::IntegerStreamMerger;
pub use printer::{OutputCapture, PrinterActor};
pub use source::{Ramp, SequenceSource};
pub use transform::TransformActor;

use conduitcore::{shared, SharedNode};

/// Wrap an actor in an [`ActorNode`] ready to add to a workflow
pub fn actor_node<A: Actor + 'static>(name: &str, actor: A) -> SharedNode {
    shared(ActorNode::new(name, actor))
}
