use std::collections::BTreeMap;

use crate::error::{IssueKind, RecordIssue};

const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueTally {
    pub count: usize,
    // First few offending keys.
    pub samples: Vec<String>,
}

// Aggregate account of a run: record-level issues are collected here and
// reported once at the end instead of interrupting the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub input_records: usize,
    pub output_rows: usize,
    pub first_rows_dropped: usize,
    pub rows_excluded: usize,
    pub issues: BTreeMap<IssueKind, IssueTally>,
}

impl RunReport {
    pub fn record(&mut self, issue: &RecordIssue) {
        log::debug!("{} [{}]: {}", issue.kind.label(), issue.key, issue.detail);
        let tally = self.issues.entry(issue.kind).or_default();
        tally.count += 1;
        if tally.samples.len() < SAMPLE_LIMIT {
            tally.samples.push(issue.key.clone());
        }
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.get(&kind).map_or(0, |t| t.count)
    }

    pub fn log_summary(&self) {
        log::info!(
            "{} input records -> {} feature rows ({} first-per-account rows dropped, {} rows excluded)",
            self.input_records,
            self.output_rows,
            self.first_rows_dropped,
            self.rows_excluded
        );
        for (kind, tally) in &self.issues {
            log::warn!(
                "{} record(s) with {}; e.g. {}",
                tally.count,
                kind.label(),
                tally.samples.join(", ")
            );
        }
    }
}
