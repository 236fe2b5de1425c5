use crate::director::take_ready_outputs;
use crate::{BufferedPublisher, Director, DirectorConfig, DirectorCore, DirectorError, DirectorKind, Publisher, Result};
use conduitcore::{EventEmitter, SharedNode, WrapupResult};

/// Push-based policy: every output is queued for each subscriber and
/// delivered once that subscriber is ready, so producers never wait.
pub struct PublishSubscribeDirector {
    core: DirectorCore,
    publisher: BufferedPublisher,
}

impl PublishSubscribeDirector {
    pub fn new() -> Self {
        Self::with_config(DirectorConfig::default())
    }

    pub fn with_config(config: DirectorConfig) -> Self {
        Self {
            core: DirectorCore::new(config),
            publisher: BufferedPublisher::new(),
        }
    }

    pub fn publisher(&self) -> &BufferedPublisher {
        &self.publisher
    }

    fn trigger_and_publish(&mut self, node: &SharedNode, emitter: &EventEmitter) -> Result<bool> {
        let (id, changed, outputs_ready) = {
            let mut guard = node.lock();
            let id = guard.id().clone();
            let changed = match guard.trigger() {
                Ok(changed) => changed.changed(),
                Err(e) => {
                    tracing::error!("Node {} failed: {}", id, e);
                    emitter.node_failed(&id, &e);
                    return Err(DirectorError::node_failed(&id, e));
                }
            };
            (id, changed, guard.outputs_ready())
        };

        if changed {
            tracing::trace!("Triggered {}", id);
            emitter.node_triggered(&id);
        }
        if outputs_ready {
            for (outflow, packet) in take_ready_outputs(node)? {
                self.publisher.publish(&outflow, packet)?;
            }
        }
        Ok(changed)
    }

    fn run_to_fixed_point(&mut self, emitter: &EventEmitter) -> Result<()> {
        let nodes = self.core.nodes().to_vec();
        let mut passes = 0usize;
        loop {
            let mut progress = false;
            for node in &nodes {
                if self.trigger_and_publish(node, emitter)? {
                    progress = true;
                }
                if self.publisher.flush_packet_to_node(node)? {
                    progress = true;
                }
            }
            passes += 1;
            if !progress {
                break;
            }
        }
        tracing::debug!("Publish/subscribe run settled after {} passes", passes);
        Ok(())
    }
}

impl Default for PublishSubscribeDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl Director for PublishSubscribeDirector {
    fn kind(&self) -> DirectorKind {
        DirectorKind::PublishSubscribe
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

        self.publisher = BufferedPublisher::new();
        for (inflow, outflows) in self.core.inflow_to_outflows_map().iter() {
            let node = self.core.node(inflow.node())?;
            for outflow in outflows {
                self.publisher.subscribe(node, inflow.label(), outflow);
            }
        }
        Ok(false)
    }

    fn initialize(&mut self) -> Result<()> {
        self.core.initialize()?;
        self.publisher.clear_packet_buffers();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let emitter = self.core.begin_run(self.kind())?;
        self.publisher.attach_events(emitter.clone());
        let outcome = self.run_to_fixed_point(&emitter);
        self.core.finish_run(outcome)
    }

    fn wrapup(&mut self) -> Result<WrapupResult> {
        self.core.begin_wrapup()?;
        let result = self.publisher.wrapup();
        self.core.finish_wrapup(result)
    }
}
