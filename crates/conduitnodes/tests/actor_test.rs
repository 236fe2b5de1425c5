use conduitcore::{ChangedState, NodeError, Packet, Value, WorkflowNode};
use conduitnodes::{
    ActorNode, IntegerStreamMerger, OutputCapture, PrinterActor, Ramp, SequenceSource, TransformActor,
};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

fn drain<N: WorkflowNode>(node: &mut N, label: &str) -> Vec<String> {
    let mut values = Vec::new();
    while node.trigger().unwrap().changed() {
        let packet = node.output_packet(label).unwrap();
        values.push(packet.to_string());
        if packet.is_end_of_stream() {
            break;
        }
    }
    values
}

#[test]
fn test_sequence_source_ends_with_eos() {
    init_tracing();
    let mut node = ActorNode::new("seq", SequenceSource::new(vec![1, 3, 5]));
    node.initialize().unwrap();

    assert_eq!(drain(&mut node, "output"), vec!["1", "3", "5", "EndOfStream"]);
    assert!(node.is_node_finished());
    assert!(node.all_eos_sent());
    assert_eq!(node.trigger().unwrap(), ChangedState::Unchanged);
}

#[test]
fn test_steps_once_finishes_after_first_step() {
    init_tracing();
    let mut node = ActorNode::new("ramp", Ramp::new(1, 1)).with_steps_once();
    node.initialize().unwrap();
    assert!(node.steps_once());
    assert_eq!(drain(&mut node, "output"), vec!["1", "EndOfStream"]);
    assert_eq!(node.step_count(), 1);

    let mut node = ActorNode::new("seq", SequenceSource::new(vec![1, 2]));
    node.set_steps_once(true);
    node.initialize().unwrap();
    assert_eq!(drain(&mut node, "output"), vec!["1", "EndOfStream"]);
}

#[test]
fn test_source_blocked_while_outflow_full() {
    let mut node = ActorNode::new("seq", SequenceSource::new(vec![1, 2]));
    node.initialize().unwrap();

    assert!(node.trigger().unwrap().changed());
    assert_eq!(node.trigger().unwrap(), ChangedState::Unchanged);
    assert_eq!(node.peek_output_packet("output").unwrap().to_string(), "1");
    node.output_packet("output").unwrap();
    assert!(node.trigger().unwrap().changed());
}

#[test]
fn test_ramp_respects_max_and_reinitializes() {
    let mut node = ActorNode::new("ramp", Ramp::new(2, 2).with_max(10));
    node.initialize().unwrap();
    assert_eq!(drain(&mut node, "output"), vec!["2", "4", "6", "8", "10", "EndOfStream"]);

    node.initialize().unwrap();
    assert!(!node.is_node_finished());
    assert_eq!(drain(&mut node, "output").len(), 6);
}

#[test]
fn test_merger_consumes_lower_input_only() {
    let mut node = ActorNode::new("merge", IntegerStreamMerger::new());
    node.initialize().unwrap();
    assert!(node.ready_for_input_packet("a"));
    assert!(node.ready_for_input_packet("b"));

    node.set_input_packet("a", Packet::new(3)).unwrap();
    assert_eq!(node.trigger().unwrap(), ChangedState::Unchanged);
    node.set_input_packet("b", Packet::new(2)).unwrap();

    assert!(node.trigger().unwrap().changed());
    assert_eq!(node.output_packet("c").unwrap().value(), Some(&Value::Integer(2)));
    assert!(!node.ready_for_input_packet("a"));
    assert!(node.ready_for_input_packet("b"));

    node.set_input_packet("b", Packet::end_of_stream()).unwrap();
    assert!(node.trigger().unwrap().changed());
    assert_eq!(node.output_packet("c").unwrap().value(), Some(&Value::Integer(3)));

    node.set_input_packet("a", Packet::end_of_stream()).unwrap();
    assert!(node.all_eos_received());
    assert!(node.trigger().unwrap().changed());
    assert!(node.output_packet("c").unwrap().is_end_of_stream());
}

#[test]
fn test_transform_failure_surfaces() {
    let mut node = ActorNode::new(
        "gate",
        TransformActor::integer(|n| {
            if n == 3 {
                Err(NodeError::ExecutionFailed("three".to_string()))
            } else {
                Ok(n * 10)
            }
        }),
    );
    node.initialize().unwrap();

    node.set_input_packet("input", Packet::new(1)).unwrap();
    node.trigger().unwrap();
    assert_eq!(node.output_packet("output").unwrap().value(), Some(&Value::Integer(10)));

    node.set_input_packet("input", Packet::new(3)).unwrap();
    assert_eq!(
        node.trigger().unwrap_err(),
        NodeError::ExecutionFailed("three".to_string())
    );
}

#[test]
fn test_transform_rejects_non_integer() {
    let mut node = ActorNode::new("double", TransformActor::integer(|n| Ok(n * 2)));
    node.initialize().unwrap();
    node.set_input_packet("input", Packet::new("text")).unwrap();
    assert!(matches!(node.trigger(), Err(NodeError::InvalidInputType { .. })));
}

#[test]
fn test_printer_captures_lines() {
    let capture = OutputCapture::new();
    let mut node = ActorNode::new("printer", PrinterActor::capturing(capture.clone()));
    node.initialize().unwrap();

    for n in [4, 8] {
        assert!(node.ready_for_input_packet("value"));
        node.set_input_packet("value", Packet::new(n)).unwrap();
        assert!(node.trigger().unwrap().changed());
    }
    node.set_input_packet("value", Packet::end_of_stream()).unwrap();
    node.trigger().unwrap();

    assert_eq!(capture.text(), "4\n8\n");
    assert!(node.is_node_finished());
    assert_eq!(node.step_count(), 2);
}

#[test]
fn test_unknown_ports_rejected() {
    let mut node = ActorNode::new("printer", PrinterActor::stdout());
    node.initialize().unwrap();
    assert!(matches!(
        node.set_input_packet("nope", Packet::new(1)),
        Err(NodeError::UnknownPort { .. })
    ));
    assert!(node.output_packet("nope").is_err());
}
