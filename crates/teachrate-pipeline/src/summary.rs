use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use teachrate_core::aggregate::Aggregation;
use teachrate_core::data_processor::NormalizedBatch;
use teachrate_core::types::Diagnostic;

/// Counters and a bounded diagnostics sample for one run. Carries no
/// timestamps, so identical input yields an identical summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub files_read: usize,
    pub records_read: u64,
    pub records_rejected: u64,
    pub rejected_by_reason: BTreeMap<String, u64>,
    pub duplicates_dropped: u64,
    pub anomalies: u64,
    pub anomalies_by_reason: BTreeMap<String, u64>,
    pub records_accepted: u64,
    pub teachers: usize,
    pub courses: usize,
    pub colleges: usize,
    pub index_tokens: usize,
    pub shards_written: usize,
    /// Total diagnostics raised; `diagnostics` holds at most the configured
    /// sample of them.
    pub diagnostics_total: u64,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    max_diagnostics: usize,
}

impl RunSummary {
    pub fn new(max_diagnostics: usize) -> Self {
        Self { max_diagnostics, ..Self::default() }
    }

    fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics_total += 1;
        if self.diagnostics.len() < self.max_diagnostics {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn record_normalization(&mut self, batch: &NormalizedBatch) {
        self.files_read = batch.files;
        self.records_read = batch.rows_read;
        self.records_rejected = batch.rejections.len() as u64;
        for rejection in &batch.rejections {
            *self.rejected_by_reason.entry(rejection.reason.code()).or_insert(0) += 1;
            self.push_diagnostic(rejection.to_diagnostic());
        }
    }

    pub fn record_aggregation(&mut self, aggregation: &Aggregation) {
        self.anomalies = aggregation.anomalies.len() as u64;
        for anomaly in &aggregation.anomalies {
            *self.anomalies_by_reason.entry(anomaly.reason.code()).or_insert(0) += 1;
            self.push_diagnostic(anomaly.to_diagnostic());
        }
        self.records_accepted = aggregation.records.len() as u64;
        self.teachers = aggregation.catalog.teachers.len();
        self.courses = aggregation.catalog.courses.len();
        self.colleges = aggregation.catalog.colleges.len();
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "files read:         {}", self.files_read)?;
        writeln!(f, "records read:       {}", self.records_read)?;
        writeln!(f, "records rejected:   {}", self.records_rejected)?;
        for (reason, count) in &self.rejected_by_reason {
            writeln!(f, "  {reason}: {count}")?;
        }
        writeln!(f, "duplicates dropped: {}", self.duplicates_dropped)?;
        writeln!(f, "anomalies:          {}", self.anomalies)?;
        for (reason, count) in &self.anomalies_by_reason {
            writeln!(f, "  {reason}: {count}")?;
        }
        writeln!(f, "records accepted:   {}", self.records_accepted)?;
        writeln!(f, "teachers:           {}", self.teachers)?;
        writeln!(f, "courses:            {}", self.courses)?;
        writeln!(f, "colleges:           {}", self.colleges)?;
        writeln!(f, "index tokens:       {}", self.index_tokens)?;
        write!(f, "shards written:     {}", self.shards_written)?;
        if !self.diagnostics.is_empty() {
            write!(f, "\ndiagnostics ({} of {}):", self.diagnostics.len(), self.diagnostics_total)?;
            for d in &self.diagnostics {
                write!(f, "\n  {d}")?;
            }
        }
        Ok(())
    }
}
