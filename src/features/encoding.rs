// Category encoding fit once on a reference dataset and frozen afterwards.
//
// Codes are the positions of the distinct categories in lexicographic order.
// The mapping is persisted as JSON so the inference run applies exactly the
// codes the training run produced; it is never refit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfig, UnseenCategoryPolicy};
use crate::csv_reader::TransactionRecord;
use crate::error::{FeatureError, FeatureResult, IssueKind};
use crate::features::{Aggregator, Derived, DerivedColumn, FeatureContext, FeatureValue};

pub const CATEGORY_CODE_COLUMN: &str = "category_code";
pub const MERCHANT_FREQUENCY_COLUMN: &str = "merchant_frequency";
// Reserved code for categories absent from the fitted mapping.
pub const UNSEEN_CATEGORY_CODE: i64 = -1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    codes: BTreeMap<String, i64>,
}

impl CategoryEncoder {
    pub fn fit<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        let distinct: BTreeSet<&str> = records.into_iter().map(|r| r.category.as_str()).collect();
        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, category)| (category.to_string(), code as i64))
            .collect();
        Self { codes }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn code(&self, category: &str) -> Option<i64> {
        self.codes.get(category).copied()
    }

    pub fn encode(&self, category: &str, policy: UnseenCategoryPolicy) -> FeatureResult<i64> {
        match (self.code(category), policy) {
            (Some(code), _) => Ok(code),
            (None, UnseenCategoryPolicy::Sentinel) => Ok(UNSEEN_CATEGORY_CODE),
            (None, UnseenCategoryPolicy::Fail) => Err(FeatureError::UnknownCategory {
                category: category.to_string(),
            }),
        }
    }

    pub fn save(&self, path: &Path) -> FeatureResult<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> FeatureResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

pub struct CategoryCode;

impl Aggregator for CategoryCode {
    fn name(&self) -> &'static str {
        "category column"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        vec![CATEGORY_CODE_COLUMN.to_string()]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let policy = ctx.config.unseen_category;
        let mut cells = Vec::with_capacity(ctx.timeline.len());
        for record in ctx.records() {
            let code = ctx.encoder.encode(&record.category, policy)?;
            cells.push(if code == UNSEEN_CATEGORY_CODE {
                Derived::Flagged(FeatureValue::Int(code), IssueKind::UnseenCategory)
            } else {
                Derived::int(code)
            });
        }
        Ok(vec![DerivedColumn::new(CATEGORY_CODE_COLUMN, cells)])
    }
}

// Number of accepted records in the run that share the row's merchant
pub fn merchant_counts<'a, I>(records: I) -> HashMap<&'a str, i64>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(record.merchant.as_str()).or_insert(0) += 1;
    }
    counts
}

pub struct MerchantFrequency;

impl Aggregator for MerchantFrequency {
    fn name(&self) -> &'static str {
        "merchant frequency"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        vec![MERCHANT_FREQUENCY_COLUMN.to_string()]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let counts = merchant_counts(ctx.store.records());
        let cells = ctx
            .records()
            .map(|record| Derived::int(counts.get(record.merchant.as_str()).copied().unwrap_or(0)))
            .collect();
        Ok(vec![DerivedColumn::new(MERCHANT_FREQUENCY_COLUMN, cells)])
    }
}
