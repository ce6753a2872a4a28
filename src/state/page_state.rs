/// Page state definitions for tracking crawl progress
///
/// Every breed page moves through `Queued → Fetching → Extracting → Enriching → Stored`.
/// Any active state may instead end in `Failed`.
use std::fmt;

/// Represents the current state of a breed page in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageState {
    // ===== Active States =====
    /// Page is waiting for an admission slot
    Queued,

    /// Page body is being retrieved (cache or network)
    Fetching,

    /// Fields and references are being extracted from the body
    Extracting,

    /// References are being resolved into metadata
    Enriching,

    // ===== Terminal States =====
    /// Record was inserted into the store
    Stored,

    /// Page could not be fetched or stored
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stored | Self::Failed)
    }

    /// Returns true if the page still occupies or awaits an admission slot
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Stored)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// Forward moves go one step at a time; any active state may fail.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        match (self, next) {
            (from, Self::Failed) => from.is_active(),
            (Self::Queued, Self::Fetching)
            | (Self::Fetching, Self::Extracting)
            | (Self::Extracting, Self::Enriching)
            | (Self::Enriching, Self::Stored) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Enriching => "enriching",
            Self::Stored => "stored",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Fetching,
            Self::Extracting,
            Self::Enriching,
            Self::Stored,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
