//! Measurement history: the append-only log every monitor writes to.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sitewatch_types::MeasurementRecord;

use crate::store;

/// Default number of records kept on disk.
pub const DEFAULT_RETENTION: usize = 500;

/// Append-ordered log of measurement records.
///
/// Records are kept in the order they were appended, which is not
/// necessarily timestamp order when probes overlap. Every accessor that
/// hands out a per-subject series sorts it by timestamp first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<MeasurementRecord>,
}

impl History {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing records, keeping their order.
    pub fn from_records(records: Vec<MeasurementRecord>) -> Self {
        Self { records }
    }

    /// Load from a state file. A missing or corrupt file gives an empty
    /// history; records that do not parse are skipped.
    pub fn load(path: &Path) -> Self {
        Self::from_records(store::load_list(path))
    }

    /// Write the whole history back to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        store::save(path, self)
    }

    /// Append a record, dropping the oldest appends beyond `retention`.
    pub fn append(&mut self, record: MeasurementRecord, retention: usize) {
        self.records.push(record);
        if retention > 0 && self.records.len() > retention {
            let excess = self.records.len() - retention;
            self.records.drain(..excess);
        }
    }

    /// All records in append order.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct subjects, alphabetically.
    pub fn subjects(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.subject.as_str()).collect()
    }

    /// Records for `subject`, oldest first.
    pub fn for_subject(&self, subject: &str) -> Vec<&MeasurementRecord> {
        let mut records: Vec<&MeasurementRecord> =
            self.records.iter().filter(|r| r.subject == subject).collect();
        records.sort_by_key(|r| r.timestamp);
        records
    }

    /// Most recent record for `subject` by timestamp.
    pub fn latest(&self, subject: &str) -> Option<&MeasurementRecord> {
        self.records
            .iter()
            .filter(|r| r.subject == subject)
            .max_by_key(|r| r.timestamp)
    }

    /// Values of `metric` for `subject`, oldest first.
    pub fn series(&self, subject: &str, metric: &str) -> Vec<f64> {
        self.for_subject(subject)
            .into_iter()
            .filter_map(|r| r.metric(metric))
            .collect()
    }

    /// Sparkline data for a metric series (normalized to 0-7 for 8 bar levels).
    ///
    /// Returns an empty Vec if there's not enough history.
    pub fn sparkline(&self, subject: &str, metric: &str, width: usize) -> Vec<u8> {
        let values = self.series(subject, metric);
        if values.len() < 2 {
            return Vec::new();
        }

        let window = &values[values.len().saturating_sub(width)..];
        let max = window.iter().copied().fold(f64::MIN, f64::max);
        let min = window.iter().copied().fold(f64::MAX, f64::min);
        let range = if max > min { max - min } else { 1.0 };

        window
            .iter()
            .map(|&v| {
                let normalized = ((v - min) / range * 7.0) as u8;
                normalized.min(7)
            })
            .collect()
    }
}
