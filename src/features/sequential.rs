// Per-account sequential features: recency and transaction count.
use crate::config::{PipelineConfig, TransactionCountMode};
use crate::csv_reader::TransactionRecord;
use crate::error::FeatureResult;
use crate::features::{Aggregator, Derived, DerivedColumn, FeatureContext, FeatureValue};

pub const RECENCY_COLUMN: &str = "time_since_last_purchase";
pub const TRANSACTION_COUNT_COLUMN: &str = "total_transactions";

// Seconds since the previous transaction of the same account.
// `records` must be one account's chronological slice.
pub fn recency_seconds(records: &[&TransactionRecord]) -> Vec<Option<i64>> {
    let mut out = Vec::with_capacity(records.len());
    let mut previous: Option<i64> = None;
    for record in records {
        let now = record.epoch_seconds();
        out.push(previous.map(|before| now - before));
        previous = Some(now);
    }
    out
}

pub fn transaction_counts(len: usize, mode: TransactionCountMode) -> Vec<i64> {
    match mode {
        TransactionCountMode::Lifetime => vec![len as i64; len],
        TransactionCountMode::Running => (1..=len as i64).collect(),
    }
}

pub struct Recency;

impl Aggregator for Recency {
    fn name(&self) -> &'static str {
        "time since last purchase"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        vec![RECENCY_COLUMN.to_string()]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let cells = ctx.per_account(|records| {
            recency_seconds(records)
                .into_iter()
                .map(|gap| gap.map_or(Derived::NoPrior, Derived::int))
                .collect()
        });
        Ok(vec![DerivedColumn::new(RECENCY_COLUMN, cells).with_sentinel(FeatureValue::Int(0))])
    }
}

pub struct TransactionCount;

impl Aggregator for TransactionCount {
    fn name(&self) -> &'static str {
        "total transactions"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        vec![TRANSACTION_COUNT_COLUMN.to_string()]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let mode = ctx.config.transaction_count;
        let cells = ctx.per_account(|records| {
            transaction_counts(records.len(), mode)
                .into_iter()
                .map(Derived::int)
                .collect()
        });
        Ok(vec![DerivedColumn::new(TRANSACTION_COUNT_COLUMN, cells)])
    }
}
