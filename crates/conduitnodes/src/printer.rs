use crate::{Actor, ActorStatus, StepInputs, StepOutput};
use conduitcore::NodeError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared line buffer a printer can write into instead of stdout
#[derive(Debug, Clone, Default)]
pub struct OutputCapture {
    lines: Arc<Mutex<Vec<String>>>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Captured lines joined with newlines, each line terminated
    pub fn text(&self) -> String {
        self.lines.lock().iter().map(|line| format!("{}\n", line)).collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

enum Sink {
    Stdout,
    Capture(OutputCapture),
}

/// Prints every value arriving on `value`, one per line
pub struct PrinterActor {
    sink: Sink,
}

impl PrinterActor {
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    pub fn capturing(capture: OutputCapture) -> Self {
        Self {
            sink: Sink::Capture(capture),
        }
    }
}

impl Actor for PrinterActor {
    fn inputs(&self) -> Vec<String> {
        vec!["value".to_string()]
    }

    fn outputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn step(&mut self, inputs: &StepInputs, _status: &mut ActorStatus) -> Result<StepOutput, NodeError> {
        let line = inputs.require("value")?.to_string();
        match &self.sink {
            Sink::Stdout => println!("{}", line),
            Sink::Capture(capture) => capture.push(line),
        }
        Ok(StepOutput::new())
    }
}
