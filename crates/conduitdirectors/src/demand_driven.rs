use crate::{Director, DirectorConfig, DirectorCore, DirectorError, DirectorKind, Result};
use conduitcore::{EventEmitter, NodeId, WrapupResult};
use std::collections::BTreeSet;

/// Pull-based policy: each round activates the sinks, which first activate
/// everything upstream of them.
///
/// Outflows are single slots. A consumer sees only the latest packet on
/// each upstream outflow, so a value overwritten before it is pulled is
/// gone.
pub struct DemandDrivenDirector {
    core: DirectorCore,
    sinks: Vec<NodeId>,
}

impl DemandDrivenDirector {
    pub fn new() -> Self {
        Self::with_config(DirectorConfig::default())
    }

    pub fn with_config(config: DirectorConfig) -> Self {
        Self {
            core: DirectorCore::new(config),
            sinks: Vec::new(),
        }
    }

    pub fn set_firing_count(&mut self, count: usize) -> Result<()> {
        self.core.require_properties_phase("set_firing_count")?;
        if count == 0 {
            return Err(DirectorError::Configuration("firing_count must be at least 1".to_string()));
        }
        self.core.config_mut().firing_count = count;
        Ok(())
    }

    pub fn firing_count(&self) -> usize {
        self.core.config().firing_count
    }

    pub fn sinks(&self) -> &[NodeId] {
        &self.sinks
    }

    fn activate(&self, id: &NodeId, stepped: &mut BTreeSet<NodeId>, emitter: &EventEmitter) -> Result<()> {
        stepped.insert(id.clone());
        let node = self.core.node(id)?;
        let inflows = node.lock().inflows();
        let fan_in = self.core.inflow_to_outflows_map();

        for inflow in &inflows {
            for outflow in fan_in.outflows_for(inflow) {
                if !stepped.contains(outflow.node()) {
                    self.activate(outflow.node(), stepped, emitter)?;
                }
            }
        }

        for inflow in &inflows {
            for outflow in fan_in.outflows_for(inflow) {
                let packet = self.core.node(outflow.node())?.lock().peek_output_packet(outflow.label());
                let Some(packet) = packet else {
                    continue;
                };
                // pulled values replace whatever the input held, ready or not
                tracing::trace!("Pulling {} from {} into {}", packet, outflow, inflow);
                node.lock()
                    .set_input_packet(inflow.label(), packet)
                    .map_err(|e| DirectorError::node_failed(id, e))?;
                emitter.packet_delivered(outflow, id, inflow.label());
            }
        }

        let triggered = node.lock().trigger();
        match triggered {
            Ok(changed) => {
                if changed.changed() {
                    tracing::trace!("Triggered {}", id);
                    emitter.node_triggered(id);
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("Node {} failed: {}", id, e);
                emitter.node_failed(id, &e);
                Err(DirectorError::node_failed(id, e))
            }
        }
    }

    fn run_rounds(&self, emitter: &EventEmitter) -> Result<()> {
        let rounds = self.core.config().firing_count;
        for round in 0..rounds {
            tracing::debug!("Demand-driven round {} of {}", round + 1, rounds);
            for node in self.core.nodes() {
                node.lock().clear_outflows();
            }
            let mut stepped = BTreeSet::new();
            for sink in &self.sinks {
                if !stepped.contains(sink) {
                    self.activate(sink, &mut stepped, emitter)?;
                }
            }
        }
        Ok(())
    }
}

impl Default for DemandDrivenDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl Director for DemandDrivenDirector {
    fn kind(&self) -> DirectorKind {
        DirectorKind::DemandDriven
    }

    fn core(&self) -> &DirectorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DirectorCore {
        &mut self.core
    }

    fn elaborate(&mut self) -> Result<bool> {
        let sinks = self.core.begin_elaborate()?.sinks()?;
        self.core.capture_graph()?;
        tracing::debug!("Demand-driven sinks: {:?}", sinks);
        self.sinks = sinks;
        Ok(false)
    }

    fn run(&mut self) -> Result<()> {
        let emitter = self.core.begin_run(self.kind())?;
        let outcome = self.run_rounds(&emitter);
        self.core.finish_run(outcome)
    }

    fn wrapup(&mut self) -> Result<WrapupResult> {
        self.core.begin_wrapup()?;
        self.core.finish_wrapup(WrapupResult::empty())
    }
}
