use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::config::PipelineConfig;
use crate::error::FeatureResult;
use crate::features::{Aggregator, Derived, DerivedColumn, FeatureContext};

const CALENDAR_COLUMNS: [&str; 4] = ["trans_year", "trans_month", "trans_day", "trans_hour"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarParts {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
}

pub fn decompose(timestamp: &NaiveDateTime) -> CalendarParts {
    CalendarParts {
        year: timestamp.year() as i64,
        month: timestamp.month() as i64,
        day: timestamp.day() as i64,
        hour: timestamp.hour() as i64,
    }
}

pub struct Calendar;

impl Aggregator for Calendar {
    fn name(&self) -> &'static str {
        "time columns"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        CALENDAR_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let mut cells: [Vec<Derived>; 4] = Default::default();
        for record in ctx.records() {
            let parts = decompose(&record.timestamp);
            for (column, value) in cells
                .iter_mut()
                .zip([parts.year, parts.month, parts.day, parts.hour])
            {
                column.push(Derived::int(value));
            }
        }
        Ok(CALENDAR_COLUMNS
            .iter()
            .zip(cells)
            .map(|(name, values)| DerivedColumn::new(*name, values))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_every_field() {
        let ts = NaiveDateTime::parse_from_str("2019-06-21 23:59:01", "%Y-%m-%d %H:%M:%S").unwrap();
        let parts = decompose(&ts);
        assert_eq!(
            parts,
            CalendarParts {
                year: 2019,
                month: 6,
                day: 21,
                hour: 23
            }
        );
    }
}
