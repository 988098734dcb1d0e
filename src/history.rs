use crate::error::{PipelineError, Result};
use crate::models::{Period, ReportRecord};

/// The history table for one system: report records ordered by period
/// ascending, append-only. Records are immutable once appended; a correction
/// is a new record for a new period, never an in-place edit.
#[derive(Debug, Default, Clone)]
pub struct History {
    records: Vec<ReportRecord>,
}

impl History {
    pub fn new() -> History {
        History::default()
    }

    /// Rebuilds a table from already-persisted rows. Rows may arrive in any
    /// order; duplicates fail as they would on live append.
    pub fn from_records(rows: Vec<ReportRecord>) -> Result<History> {
        let mut history = History::new();
        for row in rows {
            history.append(row)?;
        }
        Ok(history)
    }

    /// Inserts a record, keeping period order. Fails with `DuplicatePeriod`
    /// when a record for the same (system, period) is already present.
    pub fn append(&mut self, record: ReportRecord) -> Result<()> {
        if self.contains(&record.system, record.period) {
            return Err(PipelineError::DuplicatePeriod {
                system: record.system,
                period: record.period,
            });
        }
        let at = self
            .records
            .partition_point(|r| r.period < record.period);
        self.records.insert(at, record);
        Ok(())
    }

    pub fn contains(&self, system: &str, period: Period) -> bool {
        self.records
            .iter()
            .any(|r| r.system == system && r.period == period)
    }

    /// The maximum-period record. None means the empty-history state.
    pub fn latest(&self) -> Option<&ReportRecord> {
        self.records.last()
    }

    /// All records, period ascending. The iterator is a snapshot over the
    /// current table; later appends are not reflected in it.
    pub fn all(&self) -> impl Iterator<Item = &ReportRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
