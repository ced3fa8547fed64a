// Optional per-holder features: age at transaction and distinct billing zip codes.
use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};

use crate::config::PipelineConfig;
use crate::error::{FeatureResult, IssueKind};
use crate::features::{Aggregator, Derived, DerivedColumn, FeatureContext};

pub const AGE_COLUMN: &str = "age";
pub const UNIQUE_LOCATIONS_COLUMN: &str = "unique_locations";

// Completed years between `dob` and `on`; `None` if `dob` is after `on`.
pub fn age_in_years(dob: NaiveDate, on: NaiveDate) -> Option<i64> {
    let mut years = (on.year() - dob.year()) as i64;
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    (years >= 0).then_some(years)
}

pub struct Age;

impl Aggregator for Age {
    fn name(&self) -> &'static str {
        "age"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        vec![AGE_COLUMN.to_string()]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let cells = ctx
            .records()
            .map(|record| {
                match record
                    .dob
                    .and_then(|dob| age_in_years(dob, record.timestamp.date()))
                {
                    Some(age) => Derived::int(age),
                    None => Derived::Excluded(
                        IssueKind::InvalidBirthDate,
                        format!("dob {:?} at {}", record.dob, record.timestamp_text),
                    ),
                }
            })
            .collect();
        Ok(vec![DerivedColumn::new(AGE_COLUMN, cells)])
    }
}

pub struct UniqueLocations;

impl Aggregator for UniqueLocations {
    fn name(&self) -> &'static str {
        "unique locations"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        vec![UNIQUE_LOCATIONS_COLUMN.to_string()]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        // Rows without a zip do not add a location
        let cells = ctx.per_account(|records| {
            let distinct: HashSet<&str> = records.iter().filter_map(|r| r.zip.as_deref()).collect();
            vec![Derived::int(distinct.len() as i64); records.len()]
        });
        Ok(vec![DerivedColumn::new(UNIQUE_LOCATIONS_COLUMN, cells)])
    }
}
