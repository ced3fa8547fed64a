use crate::config::PipelineConfig;
use crate::error::FeatureResult;
use crate::features::{Aggregator, Derived, DerivedColumn, FeatureContext};

pub const ACCOUNT_COLUMN: &str = "cc_num";
pub const AMOUNT_COLUMN: &str = "amt";
pub const TIMESTAMP_COLUMN: &str = "trans_date_trans_time";
pub const CATEGORY_COLUMN: &str = "category";
pub const CITY_POP_COLUMN: &str = "city_pop";

// Copies source fields unchanged. Column presence is checked when the
// store is loaded, so this never sees a partial schema.
pub struct Passthrough;

impl Aggregator for Passthrough {
    fn name(&self) -> &'static str {
        "original columns"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        [
            ACCOUNT_COLUMN,
            AMOUNT_COLUMN,
            TIMESTAMP_COLUMN,
            CATEGORY_COLUMN,
            CITY_POP_COLUMN,
        ]
        .iter()
        .map(|c| c.to_string())
        .collect()
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let mut account = Vec::new();
        let mut amount = Vec::new();
        let mut timestamp = Vec::new();
        let mut category = Vec::new();
        let mut city_pop = Vec::new();

        for record in ctx.records() {
            account.push(Derived::text(record.account.as_str()));
            amount.push(Derived::float(record.amount));
            timestamp.push(Derived::text(record.timestamp_text.as_str()));
            category.push(Derived::text(record.category.as_str()));
            city_pop.push(Derived::int(record.city_pop));
        }

        Ok(vec![
            DerivedColumn::new(ACCOUNT_COLUMN, account),
            DerivedColumn::new(AMOUNT_COLUMN, amount),
            DerivedColumn::new(TIMESTAMP_COLUMN, timestamp),
            DerivedColumn::new(CATEGORY_COLUMN, category),
            DerivedColumn::new(CITY_POP_COLUMN, city_pop),
        ])
    }
}
