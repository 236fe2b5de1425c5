use crate::{Actor, ActorStatus, StepInputs, StepOutput};
use conduitcore::{NodeError, Value};

type TransformFn = Box<dyn FnMut(&Value) -> Result<Value, NodeError> + Send>;

/// Applies a function to every value arriving on `input`
pub struct TransformActor {
    transform: TransformFn,
}

impl TransformActor {
    pub fn new<F>(transform: F) -> Self
    where
        F: FnMut(&Value) -> Result<Value, NodeError> + Send + 'static,
    {
        Self {
            transform: Box::new(transform),
        }
    }

    /// Forward values unchanged
    pub fn identity() -> Self {
        Self::new(|value| Ok(value.clone()))
    }

    /// Apply `f` to integer values, rejecting anything else
    pub fn integer<F>(mut f: F) -> Self
    where
        F: FnMut(i64) -> Result<i64, NodeError> + Send + 'static,
    {
        Self::new(move |value| {
            let n = value.as_i64().ok_or_else(|| NodeError::InvalidInputType {
                field: "input".to_string(),
                expected: "integer".to_string(),
                actual: value.type_name().to_string(),
            })?;
            f(n).map(Value::Integer)
        })
    }
}

impl Actor for TransformActor {
    fn inputs(&self) -> Vec<String> {
        vec!["input".to_string()]
    }

    fn outputs(&self) -> Vec<String> {
        vec!["output".to_string()]
    }

    fn step(&mut self, inputs: &StepInputs, _status: &mut ActorStatus) -> Result<StepOutput, NodeError> {
        let value = inputs.require("input")?;
        let transformed = (self.transform)(value)?;
        Ok(StepOutput::new().with_output("output", transformed))
    }
}
