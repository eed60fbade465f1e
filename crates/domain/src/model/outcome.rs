use super::{SnapshotKey, TrackedService};

/// What a backup cycle did for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    /// The fetched document was stored in full.
    Stored { bytes: usize },
    /// The fetch failed and the `null` placeholder was stored instead.
    Placeholder { reason: String },
    /// The fetch failed and nothing was stored or signalled.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub service: TrackedService,
    pub key: SnapshotKey,
    pub status: BackupStatus,
    /// Whether the success datapoint was accepted by the monitoring system.
    pub signalled: bool,
}

impl BackupOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, BackupStatus::Stored { .. })
    }
}

/// Result of one backup cycle across every tracked service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub outcomes: Vec<BackupOutcome>,
}

impl BackupReport {
    pub fn outcome(&self, service: TrackedService) -> Option<&BackupOutcome> {
        self.outcomes.iter().find(|outcome| outcome.service == service)
    }

    pub fn degraded(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_complete()).count()
    }
}

/// What happened to a single item during a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    Submitted { status: u16 },
    Rejected { status: u16, body: String },
    Invalid { reason: String },
    Transport { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Position of the item inside the snapshot.
    pub index: usize,
    pub id: Option<String>,
    pub status: RestoreStatus,
}

impl RestoreOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RestoreStatus::Submitted { .. })
    }
}

/// Per-item results of one restore invocation, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub service: TrackedService,
    pub outcomes: Vec<RestoreOutcome>,
}

impl RestoreReport {
    pub fn new(service: TrackedService) -> Self {
        Self {
            service,
            outcomes: Vec::new(),
        }
    }

    pub fn submitted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.submitted()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}
