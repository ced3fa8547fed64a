// Feature aggregators.
//
// Each aggregator is a pure function of the store, the account timeline and
// the run configuration. It returns whole columns indexed by timeline slot;
// the pipeline driver decides which rows survive. Nothing here mutates a
// shared table.

use std::fmt;

use crate::config::PipelineConfig;
use crate::csv_reader::{TransactionRecord, TransactionStore};
use crate::error::{FeatureResult, IssueKind};
use crate::timeline::AccountTimeline;

pub mod calendar;
pub mod encoding;
pub mod geo;
pub mod passthrough;
pub mod profile;
pub mod sequential;
pub mod window;

pub use encoding::CategoryEncoder;

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Int(v) => Some(*v as f64),
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{v}"),
            FeatureValue::Float(v) => write!(f, "{v}"),
            FeatureValue::Text(v) => f.write_str(v),
        }
    }
}

// One cell of a derived column, before the row-exclusion policy is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    Value(FeatureValue),
    // The account has no earlier transaction to compare against.
    NoPrior,
    // Value is usable but the record must be reported.
    Flagged(FeatureValue, IssueKind),
    // Record-level failure; the row is excluded.
    Excluded(IssueKind, String),
}

impl Derived {
    pub fn int(v: i64) -> Self {
        Derived::Value(FeatureValue::Int(v))
    }

    pub fn float(v: f64) -> Self {
        Derived::Value(FeatureValue::Float(v))
    }

    pub fn text(v: impl Into<String>) -> Self {
        Derived::Value(FeatureValue::Text(v.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub name: String,
    // One cell per timeline slot.
    pub values: Vec<Derived>,
    // Substituted for `NoPrior` when rows are kept with sentinels.
    pub sentinel: FeatureValue,
}

impl DerivedColumn {
    pub fn new(name: impl Into<String>, values: Vec<Derived>) -> Self {
        Self {
            name: name.into(),
            values,
            sentinel: FeatureValue::Int(0),
        }
    }

    pub fn with_sentinel(mut self, sentinel: FeatureValue) -> Self {
        self.sentinel = sentinel;
        self
    }
}

// Everything an aggregator may read.
pub struct FeatureContext<'a> {
    pub store: &'a TransactionStore,
    pub timeline: &'a AccountTimeline,
    pub config: &'a PipelineConfig,
    pub encoder: &'a CategoryEncoder,
}

impl<'a> FeatureContext<'a> {
    // Records in timeline order.
    pub fn records(&self) -> impl Iterator<Item = &'a TransactionRecord> + 'a {
        let store = self.store;
        self.timeline
            .order()
            .iter()
            .map(move |&position| store.get(position))
    }

    // Apply `derive` to every account's chronological slice and concatenate
    // the results in timeline order. `derive` must return one cell per record.
    pub fn per_account<F>(&self, mut derive: F) -> Vec<Derived>
    where
        F: FnMut(&[&TransactionRecord]) -> Vec<Derived>,
    {
        let mut cells = Vec::with_capacity(self.timeline.len());
        for (_, records) in self.timeline.accounts(self.store) {
            let derived = derive(&records);
            debug_assert_eq!(derived.len(), records.len());
            cells.extend(derived);
        }
        cells
    }
}

pub trait Aggregator {
    // Stable name used in logs.
    fn name(&self) -> &'static str;

    // Output column names, fixed by configuration before the run.
    fn columns(&self, config: &PipelineConfig) -> Vec<String>;

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>>;
}
