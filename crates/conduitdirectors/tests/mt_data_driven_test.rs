mod common;

use common::{init_tracing, Stalled};
use conduitcore::{DirectorEvent, NodeError, NodeId, QueueKind, Value, Workflow};
use conduitdirectors::{Director, DirectorConfig, DirectorError, DirectorKind, DirectorState, MtDataDrivenDirector};
use conduitnodes::{
    actor_node, IntegerStreamMerger, OutputCapture, PrinterActor, Ramp, SequenceSource, TransformActor,
};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::TryRecvError;

fn failing_gate(fail_on: i64) -> TransformActor {
    TransformActor::integer(move |n| {
        if n == fail_on {
            Err(NodeError::ExecutionFailed(format!("cannot pass {}", n)))
        } else {
            Ok(n)
        }
    })
}

fn prepare(director: &mut MtDataDrivenDirector, workflow: Workflow) {
    director.set_workflow(workflow).unwrap();
    director.after_properties_set().unwrap();
    director.prepare().unwrap();
}

#[test]
fn test_halt_stops_every_worker_and_reports_queues() {
    init_tracing();
    let mut workflow = Workflow::new("halting");
    workflow.add_node(actor_node("ramp", Ramp::new(1, 1))).unwrap();
    workflow.add_node(actor_node("gate", failing_gate(3))).unwrap();
    workflow.add_node(actor_node("stalled", Stalled)).unwrap();
    workflow.connect("ramp", "output", "gate", "input");
    workflow.connect("gate", "output", "stalled", "input");

    let config = DirectorConfig {
        event_buffer_size: 65_536,
        ..DirectorConfig::default()
    };
    let mut director = MtDataDrivenDirector::with_config(config);
    prepare(&mut director, workflow);
    let mut events = director.subscribe_events();

    let started = Instant::now();
    let err = director.run().unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(10));

    match err {
        DirectorError::NodeFailed { node, source } => {
            assert_eq!(node, NodeId::new("gate"));
            assert_eq!(source, NodeError::ExecutionFailed("cannot pass 3".to_string()));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(director.state(), DirectorState::Ran);
    assert!(director.is_halted());

    let mut halted = 0;
    loop {
        match events.try_recv() {
            Ok(DirectorEvent::RunHalted { node_id, .. }) => {
                assert_eq!(node_id.as_str(), "gate");
                halted += 1;
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
    assert_eq!(halted, 1);

    let result = director.wrapup().unwrap();
    let stalled = result
        .records()
        .iter()
        .find(|record| record.node == NodeId::new("stalled"))
        .expect("stalled node should report its queue");
    assert_eq!(stalled.label, "input");
    assert_eq!(stalled.kind, QueueKind::Queue);
    let values: Vec<Option<&Value>> = stalled.packets.iter().map(|p| p.value()).collect();
    assert_eq!(values, vec![Some(&Value::Integer(1)), Some(&Value::Integer(2))]);
    assert_eq!(director.state(), DirectorState::WrappedUp);
}

#[test]
fn test_worker_panic_becomes_failure() {
    init_tracing();
    let mut workflow = Workflow::new("panicking");
    workflow
        .add_node(actor_node("source", SequenceSource::new(vec![1, 2, 3])))
        .unwrap();
    workflow
        .add_node(actor_node(
            "boom",
            TransformActor::integer(|n| {
                if n == 2 {
                    panic!("boom on {}", n);
                }
                Ok(n)
            }),
        ))
        .unwrap();
    workflow
        .add_node(actor_node("printer", PrinterActor::capturing(OutputCapture::new())))
        .unwrap();
    workflow.connect("source", "output", "boom", "input");
    workflow.connect("boom", "output", "printer", "value");

    let mut director = MtDataDrivenDirector::new();
    prepare(&mut director, workflow);
    match director.run().unwrap_err() {
        DirectorError::NodeFailed {
            node,
            source: NodeError::ExecutionFailed(message),
        } => {
            assert_eq!(node, NodeId::new("boom"));
            assert_eq!(message, "boom-producer panicked");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_fan_out_and_fan_in_across_threads() {
    init_tracing();
    let capture = OutputCapture::new();
    let mut workflow = Workflow::new("diamond");
    workflow
        .add_node(actor_node("source", SequenceSource::new(vec![1, 2, 3])))
        .unwrap();
    workflow
        .add_node(actor_node("double", TransformActor::integer(|n| Ok(n * 2))))
        .unwrap();
    workflow
        .add_node(actor_node("shift", TransformActor::integer(|n| Ok(n + 10))))
        .unwrap();
    workflow.add_node(actor_node("merge", IntegerStreamMerger::new())).unwrap();
    workflow
        .add_node(actor_node("printer", PrinterActor::capturing(capture.clone())))
        .unwrap();
    workflow.connect("source", "output", "double", "input");
    workflow.connect("source", "output", "shift", "input");
    workflow.connect("double", "output", "merge", "a");
    workflow.connect("shift", "output", "merge", "b");
    workflow.connect("merge", "c", "printer", "value");

    let mut director = DirectorKind::MtDataDriven.create(DirectorConfig::default());
    director.set_workflow(workflow).unwrap();
    director.after_properties_set().unwrap();
    director.prepare().unwrap();
    director.run().unwrap();

    assert_eq!(capture.text(), "2\n4\n6\n11\n12\n13\n");
    assert!(director.wrapup().unwrap().is_empty());
}

#[test]
fn test_spawn_failure_returns_after_joining() {
    init_tracing();
    let capture = OutputCapture::new();
    let config = DirectorConfig {
        // no platform can reserve this much stack
        worker_stack_size: Some(usize::MAX / 4),
        ..DirectorConfig::default()
    };
    let mut director = MtDataDrivenDirector::with_config(config);
    prepare(&mut director, common::merge_workflow(&capture));

    match director.run().unwrap_err() {
        DirectorError::Worker(message) => assert!(message.starts_with("failed to spawn worker thread")),
        other => panic!("unexpected error: {}", other),
    }
    assert!(director.is_halted());
    assert_eq!(director.state(), DirectorState::Ran);
    assert!(capture.lines().is_empty());
    assert!(director.wrapup().unwrap().is_empty());
}
