use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, FeatureResult};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
const SECONDS_PER_DAY: i64 = 86_400;

// What happens to rows that have no earlier transaction for their account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FirstRowPolicy {
    // Drop the first transaction of every account from the table.
    #[default]
    Drop,
    // Keep it; recency and speed are written as 0.
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCountMode {
    // Total transactions of the account across the whole dataset.
    #[default]
    Lifetime,
    // 1-based position of the transaction within its account.
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnseenCategoryPolicy {
    #[default]
    Fail,
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub speed: bool,
    pub age: bool,
    pub unique_locations: bool,
    pub merchant_frequency: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            speed: true,
            age: false,
            unique_locations: false,
            merchant_frequency: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window_days: i64,
    pub first_row_policy: FirstRowPolicy,
    pub transaction_count: TransactionCountMode,
    pub unseen_category: UnseenCategoryPolicy,
    pub features: FeatureToggles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            first_row_policy: FirstRowPolicy::default(),
            transaction_count: TransactionCountMode::default(),
            unseen_category: UnseenCategoryPolicy::default(),
            features: FeatureToggles::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> FeatureResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: PipelineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FeatureResult<()> {
        if self.window_days <= 0 {
            return Err(FeatureError::InvalidConfig(format!(
                "window_days must be positive, got {}",
                self.window_days
            )));
        }
        if self.window_days.checked_mul(SECONDS_PER_DAY).is_none() {
            return Err(FeatureError::InvalidConfig(format!(
                "window_days {} overflows the window length in seconds",
                self.window_days
            )));
        }
        Ok(())
    }

    // Saturates; validate() rejects windows that would overflow
    pub fn window_seconds(&self) -> i64 {
        self.window_days.saturating_mul(SECONDS_PER_DAY)
    }

    // Source columns the input file must carry for this configuration.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![
            "cc_num",
            "amt",
            "trans_date_trans_time",
            "category",
            "city_pop",
            "merchant",
            "merch_lat",
            "merch_long",
        ];
        if self.features.age {
            columns.push("dob");
        }
        if self.features.unique_locations {
            columns.push("zip");
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"first_row_policy": "sentinel", "features": {"age": true}}"#)
                .unwrap();
        assert_eq!(config.window_days, 30);
        assert_eq!(config.first_row_policy, FirstRowPolicy::Sentinel);
        assert!(config.features.age);
        assert!(config.features.speed, "untouched toggles keep their default");
        assert!(config.required_columns().contains(&"dob"));
    }

    #[test]
    fn non_positive_window_is_rejected() {
        let config = PipelineConfig {
            window_days: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(FeatureError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_window_is_rejected() {
        let config: PipelineConfig = serde_json::from_str(r#"{"window_days": 200000000000000}"#).unwrap();
        assert!(matches!(config.validate(), Err(FeatureError::InvalidConfig(_))));

        let widest = PipelineConfig {
            window_days: i64::MAX / SECONDS_PER_DAY,
            ..PipelineConfig::default()
        };
        assert!(widest.validate().is_ok());
        assert_eq!(widest.window_seconds(), (i64::MAX / SECONDS_PER_DAY) * SECONDS_PER_DAY);
    }
}
