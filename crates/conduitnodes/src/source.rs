use crate::{Actor, ActorStatus, StepInputs, StepOutput};
use conduitcore::{NodeError, Value};

/// Emits a fixed list of values, one per step, on `output`
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<Value>,
    next: usize,
}

impl SequenceSource {
    pub fn new<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }
}

impl Actor for SequenceSource {
    fn inputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<String> {
        vec!["output".to_string()]
    }

    fn initialize(&mut self, _status: &mut ActorStatus) -> Result<(), NodeError> {
        self.next = 0;
        Ok(())
    }

    fn step(&mut self, _inputs: &StepInputs, status: &mut ActorStatus) -> Result<StepOutput, NodeError> {
        let Some(value) = self.values.get(self.next).cloned() else {
            status.finish();
            return Ok(StepOutput::new());
        };
        self.next += 1;
        if self.next == self.values.len() {
            status.finish();
        }
        Ok(StepOutput::new().with_output("output", value))
    }
}

/// Counts from `initial` by `step`, up to and including `max` when one is set
#[derive(Debug, Clone)]
pub struct Ramp {
    initial: i64,
    step: i64,
    max: Option<i64>,
    next: i64,
}

impl Ramp {
    pub fn new(initial: i64, step: i64) -> Self {
        Self {
            initial,
            step,
            max: None,
            next: initial,
        }
    }

    pub fn with_max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    fn past_end(&self, value: i64) -> bool {
        match self.max {
            Some(max) if self.step >= 0 => value > max,
            Some(max) => value < max,
            None => false,
        }
    }
}

impl Actor for Ramp {
    fn inputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<String> {
        vec!["output".to_string()]
    }

    fn initialize(&mut self, _status: &mut ActorStatus) -> Result<(), NodeError> {
        if self.step == 0 && self.max.is_some() {
            return Err(NodeError::Configuration("ramp with a maximum needs a non-zero step".to_string()));
        }
        self.next = self.initial;
        Ok(())
    }

    fn step(&mut self, _inputs: &StepInputs, status: &mut ActorStatus) -> Result<StepOutput, NodeError> {
        let value = self.next;
        if self.past_end(value) {
            status.finish();
            return Ok(StepOutput::new());
        }
        self.next = value.saturating_add(self.step);
        if self.past_end(self.next) {
            status.finish();
        }
        Ok(StepOutput::new().with_output("output", value))
    }
}
