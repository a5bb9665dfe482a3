//! Append-only session history

use serde::{Deserialize, Serialize};

use crate::outcome::{ExecutionOutcome, StepRecord};
use crate::steps::PlannedStep;
use crate::variables::Variables;

/// One executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub step: PlannedStep,
    pub outcome: ExecutionOutcome,
    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    pub new_variables: Variables,
}

impl HistoryEntry {
    pub fn new(step: PlannedStep, outcome: ExecutionOutcome, new_variables: Variables) -> Self {
        Self {
            step,
            outcome,
            new_variables,
        }
    }

    pub fn record(&self) -> StepRecord {
        StepRecord::from(&self.step)
    }
}

/// The loop's memory of the run so far. Entries are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from the entries of an earlier, partial run.
    pub fn seeded(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Persisted step records, in execution order.
    pub fn records(&self) -> Vec<StepRecord> {
        self.entries.iter().map(HistoryEntry::record).collect()
    }

    /// Every variable discovered so far, later discoveries winning.
    pub fn discovered_variables(&self) -> Variables {
        let mut variables = Variables::new();
        for entry in &self.entries {
            variables.merge(&entry.new_variables);
        }
        variables
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }
}
