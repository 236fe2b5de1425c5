use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Name under which single-value packets store their resource
pub const DEFAULT_RESOURCE: &str = "value";

static NEXT_PACKET_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique packet identifier, assigned at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketId(pub u64);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
enum Body {
    Resources(BTreeMap<String, Value>),
    EndOfStream,
}

#[derive(Debug)]
struct Inner {
    id: PacketId,
    body: Body,
}

/// Immutable envelope for the resources a node produced in one firing.
///
/// Cloning shares the envelope; nothing can mutate it once built.
#[derive(Debug, Clone)]
pub struct Packet(Arc<Inner>);

impl Packet {
    /// Packet carrying a single value under [`DEFAULT_RESOURCE`]
    pub fn new(value: impl Into<Value>) -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(DEFAULT_RESOURCE.to_string(), value.into());
        Self::with_resources(resources)
    }

    pub fn with_resources(resources: BTreeMap<String, Value>) -> Self {
        Self::build(Body::Resources(resources))
    }

    /// Marker sent on every outflow of a node once it has finished
    pub fn end_of_stream() -> Self {
        Self::build(Body::EndOfStream)
    }

    fn build(body: Body) -> Self {
        let id = PacketId(NEXT_PACKET_ID.fetch_add(1, Ordering::Relaxed));
        Packet(Arc::new(Inner { id, body }))
    }

    pub fn id(&self) -> PacketId {
        self.0.id
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.0.body, Body::EndOfStream)
    }

    /// The default resource, or the only resource when there is exactly one
    pub fn value(&self) -> Option<&Value> {
        match &self.0.body {
            Body::Resources(resources) => resources
                .get(DEFAULT_RESOURCE)
                .or_else(|| match resources.len() {
                    1 => resources.values().next(),
                    _ => None,
                }),
            Body::EndOfStream => None,
        }
    }

    pub fn resource(&self, name: &str) -> Option<&Value> {
        match &self.0.body {
            Body::Resources(resources) => resources.get(name),
            Body::EndOfStream => None,
        }
    }

    pub fn resource_names(&self) -> Vec<&str> {
        match &self.0.body {
            Body::Resources(resources) => resources.keys().map(String::as_str).collect(),
            Body::EndOfStream => Vec::new(),
        }
    }

    /// True when both handles refer to the same envelope
    pub fn same_as(&self, other: &Packet) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.body {
            Body::EndOfStream => write!(f, "EndOfStream"),
            Body::Resources(resources) => match self.value() {
                Some(value) => write!(f, "{}", value),
                None => {
                    let names: Vec<&str> = resources.keys().map(String::as_str).collect();
                    write!(f, "{{{}}}", names.join(", "))
                }
            },
        }
    }
}
