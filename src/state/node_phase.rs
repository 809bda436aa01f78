/// Node phase definitions for tracing exploration progress
///
/// Every explored address walks through these phases exactly once. Saving a record
/// is a side effect of `Extracting`, so there is no dedicated "saved" phase.
use std::fmt;

/// Represents the current phase of a node during exploration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodePhase {
    // ===== Active Phases =====
    /// Address was marked visited and is waiting on the work stack
    Scheduled,

    /// Document is being fetched through the port
    Loading,

    /// Record extraction is running against the loaded document
    Extracting,

    /// Outbound candidates are being collected from the document
    LinkDiscovery,

    /// Children of this node are being explored
    Recursing,

    // ===== Terminal Phase =====
    /// Node is finished, either normally, by failure, or by its branch budget
    Done,
}

impl NodePhase {
    /// Returns the log label of this phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Loading => "loading",
            Self::Extracting => "extracting",
            Self::LinkDiscovery => "link_discovery",
            Self::Recursing => "recursing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
