use conduitcore::{DirectorEvent, EventBus, NodeId, RunId};

#[tokio::test]
async fn test_emitter_tags_events_with_run() {
    let bus = EventBus::new(16);
    let mut receiver = bus.subscribe();
    let run_id = RunId::new_v4();
    let emitter = bus.create_emitter(run_id);

    emitter.node_triggered(&NodeId::new("merge"));

    match receiver.recv().await.unwrap() {
        DirectorEvent::NodeTriggered { run_id: id, node_id, .. } => {
            assert_eq!(id, run_id);
            assert_eq!(node_id.as_str(), "merge");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_emit_without_subscribers_is_silent() {
    let bus = EventBus::default();
    bus.create_emitter(RunId::new_v4()).run_halted(&NodeId::new("x"));
}

#[test]
fn test_events_serialize_with_type_tag() {
    let bus = EventBus::new(4);
    let mut receiver = bus.subscribe();
    bus.create_emitter(RunId::new_v4())
        .packet_delivered("source.output", &NodeId::new("sink"), "input");

    let event = receiver.try_recv().unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "PacketDelivered");
    assert_eq!(json["from"], "source.output");
    assert_eq!(json["to_label"], "input");

    let back: DirectorEvent = serde_json::from_value(json).unwrap();
    assert!(matches!(back, DirectorEvent::PacketDelivered { .. }));
}
