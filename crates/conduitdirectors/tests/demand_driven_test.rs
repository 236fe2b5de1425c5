mod common;

use common::init_tracing;
use conduitcore::{shared, ChangedState, NodeError, NodeId, Outflow, OutflowSlot, Packet, Workflow, WorkflowNode};
use conduitdirectors::{DemandDrivenDirector, Director, DirectorError};
use conduitnodes::{
    actor_node, Actor, ActorStatus, OutputCapture, PrinterActor, Ramp, StepInputs, StepOutput, TransformActor,
};

/// Sends two values into its single outflow every time it fires
struct DoubleFire {
    id: NodeId,
    output: OutflowSlot,
    fired: i64,
}

impl DoubleFire {
    fn new() -> Self {
        Self {
            id: NodeId::new("double"),
            output: OutflowSlot::new(),
            fired: 0,
        }
    }
}

impl WorkflowNode for DoubleFire {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn input_labels(&self) -> Vec<String> {
        Vec::new()
    }

    fn output_labels(&self) -> Vec<String> {
        vec!["output".to_string()]
    }

    fn initialize(&mut self) -> Result<(), NodeError> {
        self.output.clear();
        self.fired = 0;
        Ok(())
    }

    fn ready_for_input_packet(&self, _label: &str) -> bool {
        false
    }

    fn set_input_packet(&mut self, label: &str, _packet: Packet) -> Result<(), NodeError> {
        Err(NodeError::UnknownPort {
            node: self.id.to_string(),
            label: label.to_string(),
        })
    }

    fn trigger(&mut self) -> Result<ChangedState, NodeError> {
        self.fired += 1;
        self.output.send(Packet::new(self.fired * 100 + 1));
        self.output.send(Packet::new(self.fired * 100 + 2));
        Ok(ChangedState::Changed)
    }

    fn packet_ready(&self, label: &str) -> bool {
        label == "output" && self.output.packet_ready()
    }

    fn output_packet(&mut self, label: &str) -> Result<Packet, NodeError> {
        self.output.take(&Outflow::new(self.id.clone(), label))
    }

    fn peek_output_packet(&self, _label: &str) -> Option<Packet> {
        self.output.peek().cloned()
    }

    fn clear_outflows(&mut self) {
        self.output.clear();
    }

    fn is_node_finished(&self) -> bool {
        false
    }

    fn all_eos_received(&self) -> bool {
        true
    }

    fn all_eos_sent(&self) -> bool {
        false
    }
}

/// Never asks for input, but records whatever it holds each time it steps
struct Unasked {
    capture: OutputCapture,
}

impl Actor for Unasked {
    fn inputs(&self) -> Vec<String> {
        vec!["value".to_string()]
    }

    fn outputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn manages_readiness(&self) -> bool {
        true
    }

    fn step(&mut self, inputs: &StepInputs, _status: &mut ActorStatus) -> Result<StepOutput, NodeError> {
        self.capture.push(inputs.require("value")?.to_string());
        Ok(StepOutput::new())
    }
}

fn prepare(director: &mut DemandDrivenDirector, workflow: Workflow, rounds: usize) {
    director.set_workflow(workflow).unwrap();
    director.set_firing_count(rounds).unwrap();
    director.after_properties_set().unwrap();
    director.prepare().unwrap();
}

#[test]
fn test_rounds_pull_from_sinks() {
    init_tracing();
    let capture = OutputCapture::new();
    let mut workflow = Workflow::new("ramp-chain");
    workflow.add_node(actor_node("ramp", Ramp::new(1, 1))).unwrap();
    workflow
        .add_node(actor_node("square", TransformActor::integer(|n| Ok(n * n))))
        .unwrap();
    workflow
        .add_node(actor_node("printer", PrinterActor::capturing(capture.clone())))
        .unwrap();
    workflow.connect("ramp", "output", "square", "input");
    workflow.connect("square", "output", "printer", "value");

    let mut director = DemandDrivenDirector::new();
    prepare(&mut director, workflow, 4);
    assert_eq!(director.sinks(), &[NodeId::new("printer")]);

    director.run().unwrap();
    assert_eq!(capture.text(), "1\n4\n9\n16\n");
    assert!(director.wrapup().unwrap().is_empty());
}

#[test]
fn test_single_slot_keeps_only_latest_value() {
    init_tracing();
    let capture = OutputCapture::new();
    let mut workflow = Workflow::new("overwrite");
    workflow.add_node(shared(DoubleFire::new())).unwrap();
    workflow
        .add_node(actor_node("printer", PrinterActor::capturing(capture.clone())))
        .unwrap();
    workflow.connect("double", "output", "printer", "value");

    let mut director = DemandDrivenDirector::new();
    prepare(&mut director, workflow, 2);
    director.run().unwrap();

    // the first value of each firing was overwritten before it was pulled
    assert_eq!(capture.lines(), vec!["102", "202"]);
    assert!(director.wrapup().unwrap().is_empty());
}

#[test]
fn test_pull_overwrites_input_not_ready_for_it() {
    init_tracing();
    let capture = OutputCapture::new();
    let mut workflow = Workflow::new("unasked");
    workflow.add_node(actor_node("ramp", Ramp::new(1, 1))).unwrap();
    workflow
        .add_node(actor_node(
            "consumer",
            Unasked {
                capture: capture.clone(),
            },
        ))
        .unwrap();
    workflow.connect("ramp", "output", "consumer", "value");

    let mut director = DemandDrivenDirector::new();
    prepare(&mut director, workflow, 3);
    director.run().unwrap();

    assert_eq!(capture.text(), "1\n2\n3\n");
}

#[test]
fn test_firing_count_fixed_after_properties() {
    let mut director = DemandDrivenDirector::new();
    director.set_workflow(Workflow::new("empty")).unwrap();
    director.after_properties_set().unwrap();
    director.elaborate().unwrap();
    assert!(matches!(
        director.set_firing_count(2),
        Err(DirectorError::Precondition { .. })
    ));
    assert_eq!(director.firing_count(), 1);
}

#[test]
fn test_node_failure_propagates_and_leaves_ran() {
    let mut workflow = Workflow::new("failing");
    workflow.add_node(actor_node("ramp", Ramp::new(1, 1))).unwrap();
    workflow
        .add_node(actor_node(
            "gate",
            TransformActor::integer(|n| {
                if n == 2 {
                    Err(NodeError::ExecutionFailed("two".to_string()))
                } else {
                    Ok(n)
                }
            }),
        ))
        .unwrap();
    workflow.connect("ramp", "output", "gate", "input");

    let mut director = DemandDrivenDirector::new();
    prepare(&mut director, workflow, 5);
    let err = director.run().unwrap_err();
    assert!(matches!(err, DirectorError::NodeFailed { ref node, .. } if node.as_str() == "gate"));
    assert_eq!(director.state(), conduitdirectors::DirectorState::Ran);
    director.wrapup().unwrap();
}
