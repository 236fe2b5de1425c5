use crate::{Actor, ActorStatus, StepInputs, StepOutput};
use conduitcore::NodeError;

/// Merges two ascending integer streams into one ascending stream.
///
/// Each step emits the lower of the current `a` and `b` values and asks
/// only for a replacement of the input it consumed. Once one stream ends
/// the other is passed through.
#[derive(Debug, Clone, Default)]
pub struct IntegerStreamMerger;

impl IntegerStreamMerger {
    pub fn new() -> Self {
        Self
    }
}

impl Actor for IntegerStreamMerger {
    fn inputs(&self) -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    fn outputs(&self) -> Vec<String> {
        vec!["c".to_string()]
    }

    fn manages_readiness(&self) -> bool {
        true
    }

    fn initialize(&mut self, status: &mut ActorStatus) -> Result<(), NodeError> {
        status.enable_input("a");
        status.enable_input("b");
        Ok(())
    }

    fn step(&mut self, inputs: &StepInputs, status: &mut ActorStatus) -> Result<StepOutput, NodeError> {
        let a = inputs.get_i64("a")?;
        let b = inputs.get_i64("b")?;

        let (c, consumed) = match (a, b) {
            (None, None) => return Err(NodeError::MissingInput("a or b".to_string())),
            (None, Some(b)) => (b, "b"),
            (Some(a), None) => (a, "a"),
            (Some(a), Some(b)) if b < a => (b, "b"),
            (Some(a), Some(_)) => (a, "a"),
        };

        status.enable_input(consumed);
        Ok(StepOutput::new().with_output("c", c))
    }
}
