use serde::Serialize;
use tracing::{info, warn};

use crate::error::HarnessResult;
use crate::fixtures::manager::{DeleteOutcome, ResourceHandle};
use crate::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEntry {
    pub handle: ResourceHandle,
    pub identity: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TeardownFailure {
    pub resource: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TeardownReport {
    pub provisioned: usize,
    pub released: usize,
    pub attempted: usize,
    pub deleted: usize,
    pub already_absent: usize,
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn accounted(&self) -> usize {
        self.released + self.attempted
    }
}

#[derive(Debug, Default)]
pub struct CleanupStack {
    entries: Vec<CleanupEntry>,
    provisioned: usize,
    released: usize,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: ResourceHandle, identity: Identity) {
        info!(
            resource = %handle.describe(),
            identity = identity.label(),
            depth = self.entries.len() + 1,
            "registered cleanup"
        );
        self.provisioned += 1;
        self.entries.push(CleanupEntry { handle, identity });
    }

    // Drops the most recent entry for `handle` after the scenario deleted it itself.
    pub fn release(&mut self, handle: &ResourceHandle) -> bool {
        match self.entries.iter().rposition(|entry| &entry.handle == handle) {
            Some(idx) => {
                self.entries.remove(idx);
                self.released += 1;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: &ResourceHandle) -> bool {
        self.entries.iter().any(|entry| &entry.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn provisioned(&self) -> usize {
        self.provisioned
    }

    pub fn applications(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.handle {
                ResourceHandle::Application { name } => Some(name.clone()),
                ResourceHandle::Buildpack { .. } => None,
            })
            .collect()
    }

    pub fn drain<F>(&mut self, mut teardown: F) -> TeardownReport
    where
        F: FnMut(&CleanupEntry) -> HarnessResult<DeleteOutcome>,
    {
        let mut report = TeardownReport {
            provisioned: self.provisioned,
            released: self.released,
            ..TeardownReport::default()
        };
        while let Some(entry) = self.entries.pop() {
            report.attempted += 1;
            match teardown(&entry) {
                Ok(DeleteOutcome::Deleted) => report.deleted += 1,
                Ok(DeleteOutcome::AlreadyAbsent) => report.already_absent += 1,
                Err(error) => {
                    warn!(resource = %entry.handle.describe(), error = %error, "teardown failed");
                    report.failures.push(TeardownFailure {
                        resource: entry.handle.describe(),
                        message: error.to_string(),
                    });
                }
            }
        }
        report
    }
}
