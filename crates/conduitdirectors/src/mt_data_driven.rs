use crate::{
    ConsumerReport, Director, DirectorConfig, DirectorCore, DirectorError, DirectorKind, HaltSignal, ProducerReport,
    Result, TriggerConsumer, TriggerProducer,
};
use conduitcore::{EventEmitter, NodeError, NodeId, QueueKind, UnusedDataRecord, WrapupResult};
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

/// Concurrent data-driven policy with one producer thread and one consumer
/// thread per node.
///
/// Workers talk only through channels built from the fan-in map. A node
/// failure halts the whole run; `run` returns it once every worker joined.
pub struct MtDataDrivenDirector {
    core: DirectorCore,
    halt: Arc<HaltSignal>,
    leftovers: Vec<UnusedDataRecord>,
}

enum WorkerReport {
    Producer(ProducerReport),
    Consumer(ConsumerReport),
}

impl MtDataDrivenDirector {
    pub fn new() -> Self {
        Self::with_config(DirectorConfig::default())
    }

    pub fn with_config(config: DirectorConfig) -> Self {
        Self {
            core: DirectorCore::new(config),
            halt: Arc::new(HaltSignal::new()),
            leftovers: Vec::new(),
        }
    }

    /// Stop the current run as if `node` had failed with `error`
    pub fn halt(&self, node: &NodeId, error: NodeError) -> bool {
        self.halt.halt(node, error)
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_halted()
    }

    fn build_workers(&self, emitter: &EventEmitter) -> Result<(Vec<TriggerProducer>, Vec<TriggerConsumer>)> {
        let mut inboxes = BTreeMap::new();
        let mut producers = Vec::new();
        let mut consumers = BTreeMap::new();

        for node in self.core.nodes() {
            let id = node.lock().id().clone();
            let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
            let (started_tx, started_rx) = mpsc::unbounded_channel();
            let (done_tx, done_rx) = mpsc::unbounded_channel();
            inboxes.insert(id.clone(), inbox_tx);
            producers.push(TriggerProducer::new(
                node.clone(),
                inbox_rx,
                started_tx,
                done_rx,
                self.halt.clone(),
                emitter.clone(),
            ));
            consumers.insert(
                id,
                TriggerConsumer::new(node.clone(), started_rx, done_tx, self.halt.clone(), emitter.clone()),
            );
        }

        for (inflow, outflows) in self.core.inflow_to_outflows_map().iter() {
            let inbox = inboxes
                .get(inflow.node())
                .ok_or_else(|| DirectorError::Configuration(format!("no producer for {}", inflow)))?;
            for outflow in outflows {
                let consumer = consumers
                    .get_mut(outflow.node())
                    .ok_or_else(|| DirectorError::Configuration(format!("no consumer for {}", outflow)))?;
                consumer.register(outflow.label(), inflow.node().clone(), inflow.label(), inbox.clone());
            }
        }

        // inboxes close once every upstream consumer has exited
        drop(inboxes);
        Ok((producers, consumers.into_values().collect()))
    }

    fn spawn_worker<F>(&self, name: String, node: NodeId, work: F) -> Result<JoinHandle<Option<WorkerReport>>>
    where
        F: Future<Output = WorkerReport> + 'static,
        F: Send,
    {
        let halt = self.halt.clone();
        let thread_name = name.clone();
        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = self.core.config().worker_stack_size {
            builder = builder.stack_size(size);
        }
        builder
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        halt.halt(&node, NodeError::ExecutionFailed(format!("{}: {}", thread_name, e)));
                        return None;
                    }
                };
                match panic::catch_unwind(AssertUnwindSafe(|| runtime.block_on(work))) {
                    Ok(report) => Some(report),
                    Err(_) => {
                        halt.halt(&node, NodeError::ExecutionFailed(format!("{} panicked", thread_name)));
                        None
                    }
                }
            })
            .map_err(|e| DirectorError::Worker(format!("failed to spawn worker thread: {}", e)))
    }

    fn run_workers(&mut self, emitter: &EventEmitter) -> Result<()> {
        let (producers, consumers) = self.build_workers(emitter)?;
        let mut handles = Vec::with_capacity(producers.len() + consumers.len());
        let mut spawn_error = None;

        for producer in producers {
            let id = producer.id().clone();
            let work = async move { WorkerReport::Producer(producer.run().await) };
            match self.spawn_worker(format!("{}-producer", id), id, work) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        if spawn_error.is_none() {
            for consumer in consumers {
                let id = consumer.id().clone();
                let work = async move { WorkerReport::Consumer(consumer.run().await) };
                match self.spawn_worker(format!("{}-consumer", id), id, work) {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }
        } else {
            drop(consumers);
        }
        if let Some(e) = &spawn_error {
            // workers already running stop on halt and are joined below
            tracing::error!("{}", e);
            self.halt.cancel();
        }
        tracing::debug!("Started {} worker threads", handles.len());

        let mut join_error = None;
        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            match handle.join() {
                Ok(Some(report)) => self.collect(report),
                Ok(None) => {}
                Err(_) => {
                    join_error.get_or_insert_with(|| DirectorError::Worker(format!("{} could not be joined", name)));
                }
            }
        }

        if let Some(e) = spawn_error {
            return Err(e);
        }
        if let Some((node, source)) = self.halt.take_failure() {
            return Err(DirectorError::NodeFailed { node, source });
        }
        match join_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn collect(&mut self, report: WorkerReport) {
        match report {
            WorkerReport::Producer(report) => {
                let Some(node) = report.node else {
                    return;
                };
                for (label, packets) in report.queued {
                    self.leftovers
                        .push(UnusedDataRecord::new(node.clone(), label, QueueKind::Queue, packets));
                }
            }
            WorkerReport::Consumer(report) => {
                for ((node, label), packets) in report.undelivered {
                    self.leftovers.push(UnusedDataRecord::new(node, label, QueueKind::Queue, packets));
                }
            }
        }
    }
}

impl Default for MtDataDrivenDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl Director for MtDataDrivenDirector {
    fn kind(&self) -> DirectorKind {
        DirectorKind::MtDataDriven
    }

    fn core(&self) -> &DirectorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DirectorCore {
        &mut self.core
    }

    fn elaborate(&mut self) -> Result<bool> {
        self.core.begin_elaborate()?;
        self.core.capture_graph()?;
        Ok(false)
    }

    fn initialize(&mut self) -> Result<()> {
        self.core.initialize()?;
        self.leftovers.clear();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let emitter = self.core.begin_run(self.kind())?;
        self.halt = Arc::new(HaltSignal::new());
        self.leftovers.clear();
        let outcome = self.run_workers(&emitter);
        self.core.finish_run(outcome)
    }

    fn wrapup(&mut self) -> Result<WrapupResult> {
        self.core.begin_wrapup()?;
        let result = WrapupResult::new(std::mem::take(&mut self.leftovers));
        self.core.finish_wrapup(result)
    }
}
