#![allow(dead_code)]

use conduitcore::{NodeError, Workflow};
use conduitdirectors::{Director, DirectorConfig, DirectorKind};
use conduitnodes::{
    actor_node, Actor, ActorStatus, IntegerStreamMerger, OutputCapture, PrinterActor, Ramp, SequenceSource,
    StepInputs, StepOutput,
};

pub const MERGED: &str = "1\n2\n3\n4\n5\n6\n6\n8\n9\n10\n15\n";

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Two ascending integer streams merged into one printed stream
pub fn merge_workflow(capture: &OutputCapture) -> Workflow {
    let mut workflow = Workflow::new("merge-streams");
    workflow
        .add_node(actor_node("a", SequenceSource::new(vec![1, 3, 5, 6, 9, 15])))
        .unwrap();
    workflow
        .add_node(actor_node("b", Ramp::new(2, 2).with_max(10)))
        .unwrap();
    workflow.add_node(actor_node("merge", IntegerStreamMerger::new())).unwrap();
    workflow
        .add_node(actor_node("printer", PrinterActor::capturing(capture.clone())))
        .unwrap();
    workflow.connect("a", "output", "merge", "a");
    workflow.connect("b", "output", "merge", "b");
    workflow.connect("merge", "c", "printer", "value");
    workflow
}

/// Build a director of `kind` with a workflow and drive it to INITIALIZED
pub fn prepared(kind: DirectorKind, config: DirectorConfig, workflow: Workflow) -> Box<dyn Director> {
    let mut director = kind.create(config);
    director.set_workflow(workflow).unwrap();
    director.after_properties_set().unwrap();
    director.prepare().unwrap();
    director
}

/// Accepts an input declaration but never asks for a value
pub struct Stalled;

impl Actor for Stalled {
    fn inputs(&self) -> Vec<String> {
        vec!["input".to_string()]
    }

    fn outputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn manages_readiness(&self) -> bool {
        true
    }

    fn step(&mut self, _inputs: &StepInputs, _status: &mut ActorStatus) -> Result<StepOutput, NodeError> {
        Err(NodeError::ExecutionFailed("stalled node stepped".to_string()))
    }
}
