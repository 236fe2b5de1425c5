use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a director, in the order a run passes through them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectorState {
    Constructed,
    PropertiesSet,
    Modified,
    Elaborated,
    Configured,
    Initialized,
    Running,
    Ran,
    WrappedUp,
    Disposed,
}

impl fmt::Display for DirectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirectorState::Constructed => "CONSTRUCTED",
            DirectorState::PropertiesSet => "PROPERTIES_SET",
            DirectorState::Modified => "MODIFIED",
            DirectorState::Elaborated => "ELABORATED",
            DirectorState::Configured => "CONFIGURED",
            DirectorState::Initialized => "INITIALIZED",
            DirectorState::Running => "RUNNING",
            DirectorState::Ran => "RAN",
            DirectorState::WrappedUp => "WRAPPED_UP",
            DirectorState::Disposed => "DISPOSED",
        };
        f.write_str(name)
    }
}
