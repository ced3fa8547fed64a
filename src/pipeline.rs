// Pipeline driver.
//
// EXECUTION ORDER (fixed; it is also the output column order):
//   1. original columns      cc_num, amt, trans_date_trans_time, category, city_pop
//   2. time columns          trans_year, trans_month, trans_day, trans_hour
//   3. category code         category_code
//   4. recency               time_since_last_purchase
//   5. transaction count     total_transactions
//   6. rolling amount        avg_amount_<N>d, max_amount_<N>d
//   7. speed                 (features.speed)
//   8. age                   (features.age)
//   9. unique locations      (features.unique_locations)
//  10. merchant frequency    (features.merchant_frequency)
//   then the label, is_fraud.
//
// The temporal index is built once per run and its order is the row order
// of the table. One first-row policy applies to every prior-dependent
// column: rows without an earlier transaction are either all dropped or all
// kept with sentinels.

use crate::config::{FirstRowPolicy, PipelineConfig};
use crate::csv_reader::TransactionStore;
use crate::error::{FeatureError, FeatureResult, RecordIssue};
use crate::features::calendar::Calendar;
use crate::features::encoding::{CategoryCode, MerchantFrequency};
use crate::features::geo::Speed;
use crate::features::passthrough::Passthrough;
use crate::features::profile::{Age, UniqueLocations};
use crate::features::sequential::{Recency, TransactionCount};
use crate::features::window::RollingAmount;
use crate::features::{Aggregator, CategoryEncoder, Derived, DerivedColumn, FeatureContext};
use crate::report::RunReport;
use crate::table::{FeatureRow, FeatureTable};
use crate::timeline::AccountTimeline;

pub struct PipelineOutput {
    pub table: FeatureTable,
    pub report: RunReport,
}

pub struct FeaturePipeline {
    config: PipelineConfig,
    encoder: CategoryEncoder,
    aggregators: Vec<Box<dyn Aggregator>>,
}

impl FeaturePipeline {
    // `encoder` is the frozen mapping; it is never refit here.
    pub fn new(config: PipelineConfig, encoder: CategoryEncoder) -> FeatureResult<Self> {
        config.validate()?;
        let mut aggregators: Vec<Box<dyn Aggregator>> = vec![
            Box::new(Passthrough),
            Box::new(Calendar),
            Box::new(CategoryCode),
            Box::new(Recency),
            Box::new(TransactionCount),
            Box::new(RollingAmount),
        ];
        if config.features.speed {
            aggregators.push(Box::new(Speed));
        }
        if config.features.age {
            aggregators.push(Box::new(Age));
        }
        if config.features.unique_locations {
            aggregators.push(Box::new(UniqueLocations));
        }
        if config.features.merchant_frequency {
            aggregators.push(Box::new(MerchantFrequency));
        }
        Ok(Self {
            config,
            encoder,
            aggregators,
        })
    }

    // Feature columns in output order, excluding the trailing label.
    pub fn schema(&self) -> Vec<String> {
        self.aggregators
            .iter()
            .flat_map(|a| a.columns(&self.config))
            .collect()
    }

    // Derives the feature table for one store
    // Inputs: loaded transaction store
    // Outputs: feature table plus run report, or EmptyResult
    // Key steps:
    // 1. Seed the report with load-time issues
    // 2. Build the timeline and run every aggregator over it
    // 3. Assemble rows, applying exclusions and the first-row policy
    pub fn run(&self, store: &TransactionStore) -> FeatureResult<PipelineOutput> {
        let mut report = RunReport {
            input_records: store.len() + store.issues().len(),
            ..RunReport::default()
        };
        for issue in store.issues() {
            report.record(issue);
        }

        let timeline = AccountTimeline::build(store);
        let ctx = FeatureContext {
            store,
            timeline: &timeline,
            config: &self.config,
            encoder: &self.encoder,
        };

        let mut columns: Vec<DerivedColumn> = Vec::new();
        for aggregator in &self.aggregators {
            let derived = aggregator.derive(&ctx)?;
            let names: Vec<&str> = derived.iter().map(|c| c.name.as_str()).collect();
            log::info!("Added {} ({})", aggregator.name(), names.join(", "));
            columns.extend(derived);
        }

        let mut table = FeatureTable::new(self.schema());
        for (slot, &position) in timeline.order().iter().enumerate() {
            let record = store.get(position);
            let mut values = Vec::with_capacity(columns.len());
            let mut excluded = false;
            let mut lacks_prior = false;

            for column in &columns {
                match &column.values[slot] {
                    Derived::Value(value) => values.push(value.clone()),
                    Derived::Flagged(value, kind) => {
                        report.record(&RecordIssue::new(*kind, record.key(), column.name.as_str()));
                        values.push(value.clone());
                    }
                    Derived::NoPrior => {
                        lacks_prior = true;
                        values.push(column.sentinel.clone());
                    }
                    Derived::Excluded(kind, detail) => {
                        report.record(&RecordIssue::new(*kind, record.key(), detail.as_str()));
                        excluded = true;
                    }
                }
            }

            if excluded {
                report.rows_excluded += 1;
                continue;
            }
            if lacks_prior && self.config.first_row_policy == FirstRowPolicy::Drop {
                report.first_rows_dropped += 1;
                continue;
            }
            table.push(FeatureRow {
                position: record.position,
                account: record.account.clone(),
                values,
                label: record.label,
            });
        }

        report.output_rows = table.len();
        report.log_summary();
        if table.is_empty() {
            return Err(FeatureError::EmptyResult {
                input_records: report.input_records,
            });
        }
        Ok(PipelineOutput { table, report })
    }
}
