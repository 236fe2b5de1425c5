use conduitcore::{ChangedState, NodeError, NodeId, Outflow, OutflowSlot, Packet, Value, WorkflowNode};
use std::collections::{BTreeMap, BTreeSet};

/// Input values handed to one step of an actor
#[derive(Debug, Clone, Default)]
pub struct StepInputs {
    values: BTreeMap<String, Value>,
}

impl StepInputs {
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.values.get(label)
    }

    /// Get required input or return error
    pub fn require(&self, label: &str) -> Result<&Value, NodeError> {
        self.values
            .get(label)
            .ok_or_else(|| NodeError::MissingInput(label.to_string()))
    }

    /// Integer input, `None` when the input has no value this step
    pub fn get_i64(&self, label: &str) -> Result<Option<i64>, NodeError> {
        match self.values.get(label) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| NodeError::InvalidInputType {
                field: label.to_string(),
                expected: "integer".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Values produced by one step, keyed by output label
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub outputs: BTreeMap<String, Value>,
}

impl StepOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }
}

/// Channel through which an actor steers its node between steps
#[derive(Debug, Clone, Default)]
pub struct ActorStatus {
    enabled: BTreeSet<String>,
    finished: bool,
}

impl ActorStatus {
    /// Ask for a fresh value on `label` before the next step.
    /// Only meaningful for actors that manage their own readiness.
    pub fn enable_input(&mut self, label: impl Into<String>) {
        self.enabled.insert(label.into());
    }

    /// The actor will not step again; end-of-stream follows
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn take_enabled(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.enabled)
    }
}

/// A node's computation, free of any port or scheduling concerns
pub trait Actor: Send {
    fn inputs(&self) -> Vec<String>;

    fn outputs(&self) -> Vec<String>;

    /// When true, only inputs enabled through [`ActorStatus::enable_input`]
    /// are refilled; the others keep their last value.
    fn manages_readiness(&self) -> bool {
        false
    }

    /// Reset state before a run
    fn initialize(&mut self, _status: &mut ActorStatus) -> Result<(), NodeError> {
        Ok(())
    }

    fn step(&mut self, inputs: &StepInputs, status: &mut ActorStatus) -> Result<StepOutput, NodeError>;
}

#[derive(Debug, Default)]
struct InputState {
    packet: Option<Packet>,
    wanted: bool,
    eos: bool,
}

/// Adapts an [`Actor`] to the [`WorkflowNode`] contract.
///
/// Each input holds at most one packet. The node steps once every wanted
/// input has a value, and after its last step sends end-of-stream on
/// every outflow.
pub struct ActorNode<A> {
    id: NodeId,
    actor: A,
    status: ActorStatus,
    inputs: BTreeMap<String, InputState>,
    outputs: BTreeMap<String, OutflowSlot>,
    finished: bool,
    eos_sent: bool,
    step_count: u64,
    max_concurrent_steps: usize,
    steps_once: bool,
}

impl<A: Actor> ActorNode<A> {
    pub fn new(name: impl Into<NodeId>, actor: A) -> Self {
        let inputs = actor
            .inputs()
            .into_iter()
            .map(|label| (label, InputState::default()))
            .collect();
        let outputs = actor
            .outputs()
            .into_iter()
            .map(|label| (label, OutflowSlot::new()))
            .collect();
        Self {
            id: name.into(),
            actor,
            status: ActorStatus::default(),
            inputs,
            outputs,
            finished: false,
            eos_sent: false,
            step_count: 0,
            max_concurrent_steps: 1,
            steps_once: false,
        }
    }

    pub fn with_max_concurrent_steps(mut self, steps: usize) -> Self {
        self.max_concurrent_steps = steps.max(1);
        self
    }

    /// Finish after the first step
    pub fn with_steps_once(mut self) -> Self {
        self.steps_once = true;
        self
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    fn unknown_port(&self, label: &str) -> NodeError {
        NodeError::UnknownPort {
            node: self.id.to_string(),
            label: label.to_string(),
        }
    }

    /// Mark inputs as wanting a new value after a step or at start-up
    fn refill(&mut self, all: bool) {
        let enabled = self.status.take_enabled();
        for (label, input) in self.inputs.iter_mut() {
            if input.eos {
                continue;
            }
            if all || enabled.contains(label) {
                input.packet = None;
                input.wanted = true;
            }
        }
    }

    fn send_end_of_stream(&mut self) {
        for slot in self.outputs.values_mut() {
            slot.send(Packet::end_of_stream());
        }
        self.finished = true;
        self.eos_sent = true;
        tracing::debug!("{} sent end-of-stream", self.id);
    }

    fn step(&mut self) -> Result<ChangedState, NodeError> {
        let values = self
            .inputs
            .iter()
            .filter_map(|(label, input)| {
                input
                    .packet
                    .as_ref()
                    .and_then(|p| p.value())
                    .map(|value| (label.clone(), value.clone()))
            })
            .collect();
        let inputs = StepInputs { values };

        let output = self.actor.step(&inputs, &mut self.status)?;
        self.step_count += 1;
        if self.steps_once {
            self.status.finish();
        }

        let manages = self.actor.manages_readiness();
        self.refill(!manages);

        let produced = !output.outputs.is_empty();
        if let Some(label) = output.outputs.keys().find(|label| !self.outputs.contains_key(*label)) {
            return Err(self.unknown_port(label));
        }
        for (label, value) in output.outputs {
            if let Some(slot) = self.outputs.get_mut(&label) {
                slot.send(Packet::new(value));
            }
        }

        if self.status.is_finished() && !produced {
            self.send_end_of_stream();
        }
        Ok(ChangedState::Changed)
    }
}

impl<A: Actor> WorkflowNode for ActorNode<A> {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn input_labels(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }

    fn output_labels(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }

    fn set_steps_once(&mut self, steps_once: bool) {
        self.steps_once = steps_once;
    }

    fn steps_once(&self) -> bool {
        self.steps_once
    }

    fn max_concurrent_steps(&self) -> usize {
        self.max_concurrent_steps
    }

    fn initialize(&mut self) -> Result<(), NodeError> {
        for input in self.inputs.values_mut() {
            *input = InputState::default();
        }
        for slot in self.outputs.values_mut() {
            slot.clear();
        }
        self.status = ActorStatus::default();
        self.finished = false;
        self.eos_sent = false;
        self.step_count = 0;

        self.actor.initialize(&mut self.status)?;
        let manages = self.actor.manages_readiness();
        self.refill(!manages);
        Ok(())
    }

    fn ready_for_input_packet(&self, label: &str) -> bool {
        !self.finished
            && self
                .inputs
                .get(label)
                .map(|input| input.wanted && !input.eos)
                .unwrap_or(false)
    }

    fn set_input_packet(&mut self, label: &str, packet: Packet) -> Result<(), NodeError> {
        let id = self.id.clone();
        let input = self
            .inputs
            .get_mut(label)
            .ok_or_else(|| NodeError::UnknownPort {
                node: id.to_string(),
                label: label.to_string(),
            })?;
        input.wanted = false;
        if packet.is_end_of_stream() {
            input.eos = true;
            input.packet = None;
        } else {
            input.packet = Some(packet);
        }
        Ok(())
    }

    fn trigger(&mut self) -> Result<ChangedState, NodeError> {
        if self.finished || self.outputs.values().any(OutflowSlot::packet_ready) {
            return Ok(ChangedState::Unchanged);
        }

        let all_eos = !self.inputs.is_empty() && self.inputs.values().all(|input| input.eos);
        if all_eos || self.status.is_finished() {
            self.send_end_of_stream();
            return Ok(ChangedState::Changed);
        }

        if self.inputs.values().any(|input| input.wanted && !input.eos) {
            return Ok(ChangedState::Unchanged);
        }
        if !self.inputs.is_empty() && self.inputs.values().all(|input| input.packet.is_none()) {
            return Ok(ChangedState::Unchanged);
        }

        self.step()
    }

    fn packet_ready(&self, label: &str) -> bool {
        self.outputs.get(label).map(OutflowSlot::packet_ready).unwrap_or(false)
    }

    fn output_packet(&mut self, label: &str) -> Result<Packet, NodeError> {
        if !self.outputs.contains_key(label) {
            return Err(self.unknown_port(label));
        }
        let outflow = Outflow::new(self.id.clone(), label);
        self.outputs
            .get_mut(label)
            .ok_or_else(|| NodeError::EmptyOutflow {
                node: self.id.to_string(),
                label: label.to_string(),
            })?
            .take(&outflow)
    }

    fn peek_output_packet(&self, label: &str) -> Option<Packet> {
        self.outputs.get(label).and_then(|slot| slot.peek().cloned())
    }

    fn clear_outflows(&mut self) {
        for slot in self.outputs.values_mut() {
            slot.clear();
        }
    }

    fn is_node_finished(&self) -> bool {
        self.finished
    }

    fn all_eos_received(&self) -> bool {
        self.inputs.values().all(|input| input.eos)
    }

    fn all_eos_sent(&self) -> bool {
        self.eos_sent
    }
}
