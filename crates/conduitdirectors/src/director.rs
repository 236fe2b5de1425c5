use crate::{
    ContractPolicy, DataDrivenDirector, DemandDrivenDirector, DirectorConfig, DirectorError, DirectorState,
    MtDataDrivenDirector, PublishSubscribeDirector, Result,
};
use chrono::Utc;
use conduitcore::{
    DirectorEvent, EventBus, EventEmitter, InflowToOutflowsMap, NodeId, Outflow, Packet, RunId, SharedNode,
    Workflow, WrapupResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tokio::sync::broadcast;

/// Lifecycle state and graph snapshot shared by every policy.
///
/// Policies embed one of these and route every lifecycle operation through
/// it, so the transition rules live in exactly one place.
pub struct DirectorCore {
    state: DirectorState,
    config: DirectorConfig,
    workflow: Option<Workflow>,
    nodes: Vec<SharedNode>,
    node_index: BTreeMap<NodeId, SharedNode>,
    fan_in: InflowToOutflowsMap,
    nodes_step_once: bool,
    event_bus: EventBus,
    emitter: Option<EventEmitter>,
    run_started: Option<Instant>,
}

impl DirectorCore {
    pub fn new(config: DirectorConfig) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        Self {
            state: DirectorState::Constructed,
            config,
            workflow: None,
            nodes: Vec::new(),
            node_index: BTreeMap::new(),
            fan_in: InflowToOutflowsMap::new(),
            nodes_step_once: false,
            event_bus,
            emitter: None,
            run_started: None,
        }
    }

    pub fn state(&self) -> DirectorState {
        self.state
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DirectorConfig {
        &mut self.config
    }

    /// Check that the director is in one of `expected`.
    ///
    /// Under [`ContractPolicy::Log`] a violation is logged and the call is
    /// allowed to proceed.
    pub fn require(&self, operation: &'static str, expected: &[DirectorState]) -> Result<()> {
        if expected.contains(&self.state) {
            return Ok(());
        }
        match self.config.contract_policy {
            ContractPolicy::Enforce => Err(DirectorError::Precondition {
                operation,
                state: self.state,
                expected: expected.to_vec(),
            }),
            ContractPolicy::Log => {
                tracing::error!(
                    "{} called in state {}, expected one of {:?}",
                    operation,
                    self.state,
                    expected
                );
                Ok(())
            }
        }
    }

    fn transition(&mut self, to: DirectorState) {
        tracing::debug!("Director state {} -> {}", self.state, to);
        self.state = to;
    }

    pub fn require_properties_phase(&self, operation: &'static str) -> Result<()> {
        self.require(operation, &[DirectorState::Constructed, DirectorState::PropertiesSet])
    }

    pub fn set_workflow(&mut self, workflow: Workflow) -> Result<()> {
        self.require_properties_phase("set_workflow")?;
        self.workflow = Some(workflow);
        Ok(())
    }

    pub fn set_nodes_step_once(&mut self, step_once: bool) -> Result<()> {
        self.require_properties_phase("set_nodes_step_once")?;
        self.nodes_step_once = step_once;
        Ok(())
    }

    pub fn nodes_step_once(&self) -> bool {
        self.nodes_step_once
    }

    pub fn after_properties_set(&mut self) -> Result<()> {
        self.require("after_properties_set", &[DirectorState::Constructed])?;
        if self.config.firing_count == 0 {
            return Err(DirectorError::Configuration("firing_count must be at least 1".to_string()));
        }
        self.transition(DirectorState::PropertiesSet);
        Ok(())
    }

    pub fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_ref()
    }

    /// Validate state and graph at the start of an elaborate call
    pub fn begin_elaborate(&mut self) -> Result<&mut Workflow> {
        self.require("elaborate", &[DirectorState::PropertiesSet, DirectorState::Modified])?;
        let workflow = self
            .workflow
            .as_mut()
            .ok_or_else(|| DirectorError::Configuration("elaborate called before a workflow was set".to_string()))?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Record that the graph was rewritten and a second elaborate is needed
    pub fn mark_modified(&mut self) {
        self.transition(DirectorState::Modified);
    }

    /// Snapshot the node list and fan-in map and move to ELABORATED
    pub fn capture_graph(&mut self) -> Result<()> {
        let workflow = self
            .workflow
            .as_ref()
            .ok_or_else(|| DirectorError::Configuration("no workflow to elaborate".to_string()))?;
        self.nodes = workflow.nodes().to_vec();
        self.node_index = self
            .nodes
            .iter()
            .map(|node| (node.lock().id().clone(), node.clone()))
            .collect();
        self.fan_in = workflow.inflow_to_outflows_map().clone();
        if self.nodes_step_once {
            for node in &self.nodes {
                node.lock().set_steps_once(true);
            }
        }
        tracing::info!(
            "Elaborated workflow '{}' with {} nodes and {} inflows",
            workflow.name,
            self.nodes.len(),
            self.fan_in.len()
        );
        self.transition(DirectorState::Elaborated);
        Ok(())
    }

    pub fn nodes(&self) -> &[SharedNode] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Result<&SharedNode> {
        self.node_index
            .get(id)
            .ok_or_else(|| DirectorError::Configuration(format!("node {} is not part of the elaborated graph", id)))
    }

    pub fn node_index(&self) -> &BTreeMap<NodeId, SharedNode> {
        &self.node_index
    }

    pub fn inflow_to_outflows_map(&self) -> &InflowToOutflowsMap {
        &self.fan_in
    }

    pub fn configure(&mut self) -> Result<()> {
        self.require("configure", &[DirectorState::Elaborated])?;
        self.transition(DirectorState::Configured);
        Ok(())
    }

    /// Reset every node so the graph can be driven from the start
    pub fn initialize(&mut self) -> Result<()> {
        self.require("initialize", &[DirectorState::Configured, DirectorState::WrappedUp])?;
        for node in &self.nodes {
            let mut node = node.lock();
            let id = node.id().clone();
            node.initialize().map_err(|e| DirectorError::node_failed(&id, e))?;
        }
        self.transition(DirectorState::Initialized);
        Ok(())
    }

    /// Enter RUNNING and open a new run on the event bus
    pub fn begin_run(&mut self, kind: DirectorKind) -> Result<EventEmitter> {
        self.require("run", &[DirectorState::Initialized, DirectorState::WrappedUp])?;
        self.transition(DirectorState::Running);

        let run_id = RunId::new_v4();
        let emitter = self.event_bus.create_emitter(run_id);
        let workflow = self.workflow.as_ref().map(|w| w.name.clone()).unwrap_or_default();
        tracing::info!("Starting {} run {} of workflow '{}'", kind, run_id, workflow);
        self.event_bus.emit(DirectorEvent::RunStarted {
            run_id,
            workflow,
            director: kind.to_string(),
            timestamp: Utc::now(),
        });
        self.emitter = Some(emitter.clone());
        self.run_started = Some(Instant::now());
        Ok(emitter)
    }

    /// Leave RUNNING. The director ends up in RAN whatever the outcome,
    /// so a failed run can still be wrapped up.
    pub fn finish_run(&mut self, outcome: Result<()>) -> Result<()> {
        let duration_ms = self
            .run_started
            .take()
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or_default();
        if let Some(emitter) = &self.emitter {
            emitter.emit(DirectorEvent::RunCompleted {
                run_id: emitter.run_id(),
                success: outcome.is_ok(),
                duration_ms,
                timestamp: Utc::now(),
            });
        }
        match &outcome {
            Ok(()) => tracing::info!("Run completed in {}ms", duration_ms),
            Err(e) => tracing::error!("Run failed after {}ms: {}", duration_ms, e),
        }
        self.transition(DirectorState::Ran);
        outcome
    }

    pub fn begin_wrapup(&self) -> Result<()> {
        self.require("wrapup", &[DirectorState::Initialized, DirectorState::Ran])
    }

    /// Publish the unused-data report and move to WRAPPED_UP
    pub fn finish_wrapup(&mut self, result: WrapupResult) -> Result<WrapupResult> {
        for record in result.records() {
            tracing::warn!("Unused data: {}", record);
            if let Some(emitter) = &self.emitter {
                emitter.emit(DirectorEvent::UnusedData {
                    run_id: emitter.run_id(),
                    node_id: record.node.clone(),
                    label: record.label.clone(),
                    kind: record.kind,
                    packets: record.packets.len(),
                    timestamp: Utc::now(),
                });
            }
        }
        self.transition(DirectorState::WrappedUp);
        Ok(result)
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.require("dispose", &[DirectorState::WrappedUp])?;
        self.nodes.clear();
        self.node_index.clear();
        self.fan_in = InflowToOutflowsMap::new();
        self.emitter = None;
        self.transition(DirectorState::Disposed);
        Ok(())
    }

    pub fn emitter(&self) -> Option<&EventEmitter> {
        self.emitter.as_ref()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DirectorEvent> {
        self.event_bus.subscribe()
    }
}

/// Take every packet a node left in its outflows.
///
/// The node's lock is released before the caller delivers anything, so a
/// node subscribed to its own outflow can be locked again.
pub fn take_ready_outputs(node: &SharedNode) -> Result<Vec<(Outflow, Packet)>> {
    let mut node = node.lock();
    let id = node.id().clone();
    let mut outputs = Vec::new();
    for label in node.output_labels() {
        if node.packet_ready(&label) {
            let packet = node.output_packet(&label).map_err(|e| DirectorError::node_failed(&id, e))?;
            outputs.push((Outflow::new(id.clone(), &label), packet));
        }
    }
    Ok(outputs)
}

/// Scheduling policy driving a workflow through the shared lifecycle.
///
/// Everything except `elaborate`, `run` and `wrapup` has a default that
/// delegates to [`DirectorCore`].
pub trait Director: Send {
    fn kind(&self) -> DirectorKind;

    fn core(&self) -> &DirectorCore;

    fn core_mut(&mut self) -> &mut DirectorCore;

    fn set_workflow(&mut self, workflow: Workflow) -> Result<()> {
        self.core_mut().set_workflow(workflow)
    }

    fn set_nodes_step_once(&mut self, step_once: bool) -> Result<()> {
        self.core_mut().set_nodes_step_once(step_once)
    }

    fn after_properties_set(&mut self) -> Result<()> {
        self.core_mut().after_properties_set()
    }

    /// Returns `true` when the graph was modified and `elaborate` must be
    /// called again
    fn elaborate(&mut self) -> Result<bool>;

    fn configure(&mut self) -> Result<()> {
        self.core_mut().configure()
    }

    fn initialize(&mut self) -> Result<()> {
        self.core_mut().initialize()
    }

    fn run(&mut self) -> Result<()>;

    fn wrapup(&mut self) -> Result<WrapupResult>;

    fn dispose(&mut self) -> Result<()> {
        self.core_mut().dispose()
    }

    fn state(&self) -> DirectorState {
        self.core().state()
    }

    fn nodes_step_once(&self) -> bool {
        self.core().nodes_step_once()
    }

    fn workflow(&self) -> Option<&Workflow> {
        self.core().workflow()
    }

    fn subscribe_events(&self) -> broadcast::Receiver<DirectorEvent> {
        self.core().subscribe_events()
    }

    /// Drive the director from PROPERTIES_SET through INITIALIZED,
    /// repeating `elaborate` until the graph settles
    fn prepare(&mut self) -> Result<()> {
        while self.elaborate()? {}
        self.configure()?;
        self.initialize()
    }
}

/// The available scheduling policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectorKind {
    PublishSubscribe,
    DataDriven,
    DemandDriven,
    MtDataDriven,
}

impl DirectorKind {
    pub fn create(self, config: DirectorConfig) -> Box<dyn Director> {
        match self {
            DirectorKind::PublishSubscribe => Box::new(PublishSubscribeDirector::with_config(config)),
            DirectorKind::DataDriven => Box::new(DataDrivenDirector::with_config(config)),
            DirectorKind::DemandDriven => Box::new(DemandDrivenDirector::with_config(config)),
            DirectorKind::MtDataDriven => Box::new(MtDataDrivenDirector::with_config(config)),
        }
    }
}

impl fmt::Display for DirectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirectorKind::PublishSubscribe => "publish-subscribe",
            DirectorKind::DataDriven => "data-driven",
            DirectorKind::DemandDriven => "demand-driven",
            DirectorKind::MtDataDriven => "mt-data-driven",
        };
        f.write_str(name)
    }
}
