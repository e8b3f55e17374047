//! Session-scoped accumulation of alert records.
//!
//! A [`RecordCollection`] is created when a session starts and handed to
//! [`crate::submit::submit`] by mutable reference. Records are only ever
//! appended; the collection is emptied only by an explicit [`RecordCollection::reset`].

use crate::record::AlertRecord;
use serde::Serialize;
use tracing::info;

/// Ordered, append-only set of records. Insertion order is export order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordCollection {
    records: Vec<AlertRecord>,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return a reference to it.
    pub fn append(&mut self, record: AlertRecord) -> &AlertRecord {
        self.records.push(record);
        info!("Collection now holds {} record(s)", self.records.len());
        let last = self.records.len() - 1;
        &self.records[last]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AlertRecord> {
        self.records.iter()
    }

    /// Drop every record, ending the current session.
    pub fn reset(&mut self) {
        info!("Resetting collection ({} record(s) dropped)", self.records.len());
        self.records.clear();
    }
}

impl<'a> IntoIterator for &'a RecordCollection {
    type Item = &'a AlertRecord;
    type IntoIter = std::slice::Iter<'a, AlertRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
