use conduitcore::{NodeError, NodeId};
use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Run-wide stop flag shared by every worker of a multithreaded run.
///
/// The first worker to report a failure wins; later reports are logged
/// and dropped. Cancelling wakes every worker waiting on [`HaltSignal::halted`].
#[derive(Debug, Default)]
pub struct HaltSignal {
    token: CancellationToken,
    failure: Mutex<Option<(NodeId, NodeError)>>,
}

impl HaltSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run because `node` failed. Returns whether this call was
    /// the one that halted it.
    pub fn halt(&self, node: &NodeId, error: NodeError) -> bool {
        let mut failure = self.failure.lock();
        if failure.is_some() || self.token.is_cancelled() {
            tracing::debug!("Ignoring failure of {} after halt: {}", node, error);
            return false;
        }
        tracing::error!("Halting run, node {} failed: {}", node, error);
        *failure = Some((node.clone(), error));
        self.token.cancel();
        true
    }

    /// Stop the run without recording a failure
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_halted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the run is halted
    pub fn halted(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn failure(&self) -> Option<(NodeId, NodeError)> {
        self.failure.lock().clone()
    }

    pub fn take_failure(&self) -> Option<(NodeId, NodeError)> {
        self.failure.lock().take()
    }
}
