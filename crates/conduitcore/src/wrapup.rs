use crate::{NodeId, Packet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where leftover packets were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    /// A publisher or worker input queue
    Queue,
    /// A hidden buffer node's queue
    Buffer,
    /// An outflow whose subscribers never all became ready
    Outflow,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Queue => write!(f, "queue"),
            QueueKind::Buffer => write!(f, "buffer"),
            QueueKind::Outflow => write!(f, "outflow"),
        }
    }
}

/// Packets staged for one (node, label) but never consumed
#[derive(Debug, Clone)]
pub struct UnusedDataRecord {
    pub node: NodeId,
    pub label: String,
    pub kind: QueueKind,
    pub packets: Vec<Packet>,
}

impl UnusedDataRecord {
    /// End-of-stream markers are not data and are dropped here
    pub fn new(node: NodeId, label: impl Into<String>, kind: QueueKind, packets: Vec<Packet>) -> Self {
        Self {
            node,
            label: label.into(),
            kind,
            packets: packets.into_iter().filter(|p| !p.is_end_of_stream()).collect(),
        }
    }

    fn sort_key(&self) -> (&NodeId, &str, QueueKind) {
        (&self.node, &self.label, self.kind)
    }
}

impl fmt::Display for UnusedDataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.packets.len();
        let values: Vec<String> = self.packets.iter().map(|p| p.to_string()).collect();
        write!(
            f,
            "{} packet{} in {} '{}' on node <{}> with value{} {}",
            count,
            if count == 1 { "" } else { "s" },
            self.kind,
            self.label,
            self.node,
            if count == 1 { "" } else { "s" },
            values.join(", ")
        )
    }
}

/// What a director found left over when it wrapped up a run
#[derive(Debug, Clone, Default)]
pub struct WrapupResult {
    records: Vec<UnusedDataRecord>,
}

impl WrapupResult {
    /// Empty records are discarded and the rest sorted by (node, label, kind)
    pub fn new(records: impl IntoIterator<Item = UnusedDataRecord>) -> Self {
        let mut records: Vec<UnusedDataRecord> = records.into_iter().filter(|r| !r.packets.is_empty()).collect();
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[UnusedDataRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn unused_packet_count(&self) -> usize {
        self.records.iter().map(|r| r.packets.len()).sum()
    }

    pub fn merge(self, other: WrapupResult) -> WrapupResult {
        WrapupResult::new(self.records.into_iter().chain(other.records))
    }
}

impl fmt::Display for WrapupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.records.is_empty() {
            return write!(f, "No unused data");
        }
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}
