// Temporal indexer: groups the store by account and orders each group by time.
//
// The timeline is an arena of record positions sorted by
// (account, timestamp, ingestion position) plus one contiguous span per
// account. Every per-account aggregator walks these spans, and the feature
// table is emitted in arena order.

use std::ops::Range;

use crate::csv_reader::{TransactionRecord, TransactionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpan {
    pub account: String,
    // Range into the timeline arena.
    pub range: Range<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountTimeline {
    order: Vec<usize>,
    spans: Vec<AccountSpan>,
}

impl AccountTimeline {
    // Groups and orders the store
    // Inputs: transaction store
    // Outputs: arena of positions plus one span per account
    pub fn build(store: &TransactionStore) -> Self {
        let records = store.records();
        let mut order: Vec<usize> = (0..records.len()).collect();
        // Stable: equal (account, timestamp) pairs keep ingestion order.
        order.sort_by(|&a, &b| {
            let (ra, rb) = (&records[a], &records[b]);
            ra.account
                .cmp(&rb.account)
                .then(ra.timestamp.cmp(&rb.timestamp))
        });

        let mut spans: Vec<AccountSpan> = Vec::new();
        for (slot, &position) in order.iter().enumerate() {
            let account = &records[position].account;
            match spans.last_mut() {
                Some(span) if &span.account == account => span.range.end = slot + 1,
                _ => spans.push(AccountSpan {
                    account: account.clone(),
                    range: slot..slot + 1,
                }),
            }
        }

        log::debug!(
            "Indexed {} transactions across {} accounts",
            order.len(),
            spans.len()
        );
        Self { order, spans }
    }

    // Record positions in timeline order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn spans(&self) -> &[AccountSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // Iterate accounts with their records in chronological order.
    pub fn accounts<'a>(
        &'a self,
        store: &'a TransactionStore,
    ) -> impl Iterator<Item = (&'a AccountSpan, Vec<&'a TransactionRecord>)> + 'a {
        self.spans.iter().map(move |span| {
            let records = self.order[span.range.clone()]
                .iter()
                .map(|&position| store.get(position))
                .collect();
            (span, records)
        })
    }
}
