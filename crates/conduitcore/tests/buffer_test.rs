use conduitcore::{
    BufferNode, ChangedState, NodeId, Packet, QueueKind, UnusedDataRecord, Value, WorkflowNode, WrapupResult,
};

#[test]
fn test_buffer_releases_in_arrival_order() {
    let mut buffer = BufferNode::hidden(NodeId::new("merge"), "a", 1);
    buffer.set_input_packet("input", Packet::new(1)).unwrap();
    buffer.set_input_packet("input", Packet::new(2)).unwrap();
    assert_eq!(buffer.queue_size(), 2);

    assert_eq!(buffer.trigger().unwrap(), ChangedState::Changed);
    // slot occupied, nothing more released
    assert_eq!(buffer.trigger().unwrap(), ChangedState::Unchanged);
    let first = buffer.output_packet("output").unwrap();
    assert_eq!(first.value(), Some(&Value::Integer(1)));

    assert_eq!(buffer.trigger().unwrap(), ChangedState::Changed);
    assert_eq!(buffer.output_packet("output").unwrap().value(), Some(&Value::Integer(2)));
    assert!(buffer.output_packet("output").is_err());
}

#[test]
fn test_buffer_waits_for_every_upstream_eos() {
    let mut buffer = BufferNode::hidden(NodeId::new("printer"), "value", 2);
    buffer.set_input_packet("input", Packet::end_of_stream()).unwrap();
    assert!(buffer.ready_for_input_packet("input"));
    assert!(!buffer.all_eos_received());
    assert_eq!(buffer.queue_size(), 0);

    buffer.set_input_packet("input", Packet::new(7)).unwrap();
    buffer.set_input_packet("input", Packet::end_of_stream()).unwrap();
    assert!(!buffer.ready_for_input_packet("input"));
    assert!(buffer.all_eos_received());

    buffer.trigger().unwrap();
    buffer.output_packet("output").unwrap();
    buffer.trigger().unwrap();
    assert!(buffer.output_packet("output").unwrap().is_end_of_stream());
    assert!(buffer.all_eos_sent());
    assert!(buffer.is_node_finished());
}

#[test]
fn test_buffer_initialize_resets() {
    let mut buffer = BufferNode::hidden(NodeId::new("n"), "x", 1);
    buffer.set_input_packet("input", Packet::new(1)).unwrap();
    buffer.set_input_packet("input", Packet::end_of_stream()).unwrap();
    buffer.initialize().unwrap();
    assert_eq!(buffer.queue_size(), 0);
    assert!(buffer.ready_for_input_packet("input"));
    assert!(buffer.set_input_packet("other", Packet::new(1)).is_err());
}

#[test]
fn test_wrapup_result_sorting_and_display() {
    let result = WrapupResult::new(vec![
        UnusedDataRecord::new(NodeId::new("z"), "in", QueueKind::Queue, vec![Packet::new(9)]),
        UnusedDataRecord::new(NodeId::new("merge"), "b", QueueKind::Queue, vec![Packet::end_of_stream()]),
        UnusedDataRecord::new(
            NodeId::new("merge"),
            "a",
            QueueKind::Queue,
            vec![Packet::new(4), Packet::new(6), Packet::end_of_stream()],
        ),
    ]);

    assert_eq!(result.records().len(), 2);
    assert_eq!(result.unused_packet_count(), 3);
    assert_eq!(
        result.to_string(),
        "2 packets in queue 'a' on node <merge> with values 4, 6\n1 packet in queue 'in' on node <z> with value 9"
    );

    let merged = result.merge(WrapupResult::new(vec![UnusedDataRecord::new(
        NodeId::new("a"),
        "out",
        QueueKind::Outflow,
        vec![Packet::new(1)],
    )]));
    assert_eq!(merged.records()[0].node.as_str(), "a");
    assert!(WrapupResult::empty().is_empty());
}
