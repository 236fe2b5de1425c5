//! Director subsystem
//!
//! Directors decide when the nodes of a workflow fire and how their output
//! packets reach subscribers. Four policies share one lifecycle:
//! publish/subscribe, data-driven, demand-driven and a multithreaded
//! data-driven policy running a producer/consumer worker pair per node.

mod config;
mod data_driven;
mod demand_driven;
mod director;
mod error;
mod halt;
mod mt_data_driven;
mod publish_subscribe;
mod publisher;
mod state;
mod subscriptions;
mod trigger_consumer;
mod trigger_producer;

pub use config::{ContractPolicy, DirectorConfig};
pub use data_driven::DataDrivenDirector;
pub use demand_driven::DemandDrivenDirector;
pub use director::{take_ready_outputs, Director, DirectorCore, DirectorKind};
pub use error::{DirectorError, Result};
pub use halt::HaltSignal;
pub use mt_data_driven::MtDataDrivenDirector;
pub use publish_subscribe::PublishSubscribeDirector;
pub use publisher::{BufferedPublisher, Publisher};
pub use state::DirectorState;
pub use subscriptions::{NodeInput, OutflowSubscriptions};
pub use trigger_consumer::{BroadcastTarget, ConsumerReport, TriggerConsumer};
pub use trigger_producer::{Delivery, ProducerReport, TriggerProducer};
