// Trailing-window amount statistics per account.
//
// The window for transaction `i` covers `(t_i - window, t_i]` and contains
// only transactions at or before `i` in the account's chronological order,
// so `i` itself is always included. A two-pointer scan keeps a running sum
// for the mean and a monotonic deque for the max: linear per account once
// the timeline is sorted.

use std::collections::VecDeque;

use crate::config::PipelineConfig;
use crate::error::FeatureResult;
use crate::features::{Aggregator, Derived, DerivedColumn, FeatureContext};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub max: f64,
}

// Rolling mean and max for one account
// Inputs: non-decreasing epoch seconds, matching amounts, window length in seconds
// Outputs: one WindowStats per transaction
// Key steps:
// 1. Add the current amount to the running sum and the max deque
// 2. Evict rows at or before now - window, never past the current row
// 3. Read the mean from the sum and the max from the deque front
pub fn rolling_amount_stats(timestamps: &[i64], amounts: &[f64], window_seconds: i64) -> Vec<WindowStats> {
    let mut stats = Vec::with_capacity(amounts.len());
    let mut left = 0;
    let mut sum = 0.0;
    let mut maxima: VecDeque<usize> = VecDeque::new();

    for (i, (&now, &amount)) in timestamps.iter().zip(amounts).enumerate() {
        sum += amount;
        while maxima.back().is_some_and(|&j| amounts[j] <= amount) {
            maxima.pop_back();
        }
        maxima.push_back(i);

        let lower = now.saturating_sub(window_seconds);
        while left < i && timestamps[left] <= lower {
            sum -= amounts[left];
            left += 1;
        }
        if left == i {
            // Drop accumulated rounding once the window collapses to one row.
            sum = amount;
        }
        while maxima.front().is_some_and(|&j| j < left) {
            maxima.pop_front();
        }

        let count = (i - left + 1) as f64;
        stats.push(WindowStats {
            mean: sum / count,
            max: amounts[maxima[0]],
        });
    }
    stats
}

pub fn mean_column(config: &PipelineConfig) -> String {
    format!("avg_amount_{}d", config.window_days)
}

pub fn max_column(config: &PipelineConfig) -> String {
    format!("max_amount_{}d", config.window_days)
}

pub struct RollingAmount;

impl Aggregator for RollingAmount {
    fn name(&self) -> &'static str {
        "rolling amount"
    }

    fn columns(&self, config: &PipelineConfig) -> Vec<String> {
        vec![mean_column(config), max_column(config)]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let window_seconds = ctx.config.window_seconds();
        let mut means = Vec::with_capacity(ctx.timeline.len());
        let mut maxima = Vec::with_capacity(ctx.timeline.len());

        for (_, records) in ctx.timeline.accounts(ctx.store) {
            let timestamps: Vec<i64> = records.iter().map(|r| r.epoch_seconds()).collect();
            let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
            for stats in rolling_amount_stats(&timestamps, &amounts, window_seconds) {
                means.push(Derived::float(stats.mean));
                maxima.push(Derived::float(stats.max));
            }
        }

        Ok(vec![
            DerivedColumn::new(mean_column(ctx.config), means),
            DerivedColumn::new(max_column(ctx.config), maxima),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    // Quadratic rescan used as the reference for the two-pointer scan.
    fn naive_rolling(timestamps: &[i64], amounts: &[f64], window_seconds: i64) -> Vec<WindowStats> {
        (0..amounts.len())
            .map(|i| {
                let in_window: Vec<f64> = (0..=i)
                    .filter(|&j| timestamps[j] > timestamps[i] - window_seconds)
                    .map(|j| amounts[j])
                    .collect();
                WindowStats {
                    mean: in_window.iter().sum::<f64>() / in_window.len() as f64,
                    max: in_window.iter().cloned().fold(f64::MIN, f64::max),
                }
            })
            .collect()
    }

    #[test]
    fn first_transaction_is_its_own_window() {
        let stats = rolling_amount_stats(&[0], &[42.5], 30 * DAY);
        assert_eq!(stats, vec![WindowStats { mean: 42.5, max: 42.5 }]);
    }

    #[test]
    fn window_evicts_old_transactions() {
        let timestamps = [0, 10 * DAY, 31 * DAY, 45 * DAY];
        let amounts = [100.0, 10.0, 20.0, 5.0];
        let stats = rolling_amount_stats(&timestamps, &amounts, 30 * DAY);

        assert_eq!(stats[1], WindowStats { mean: 55.0, max: 100.0 });
        // Day 31: day 0 left the window, day 10 is still inside.
        assert_eq!(stats[2], WindowStats { mean: 15.0, max: 20.0 });
        assert_eq!(stats[3], WindowStats { mean: 12.5, max: 20.0 });
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let stats = rolling_amount_stats(&[0, 30 * DAY], &[50.0, 10.0], 30 * DAY);
        assert_eq!(stats[1], WindowStats { mean: 10.0, max: 10.0 });
    }

    #[test]
    fn matches_naive_rescan() {
        let mut timestamps: Vec<i64> = (0..60).map(|i| (i * i * 3_607) % (200 * DAY)).collect();
        timestamps.sort_unstable();
        let amounts: Vec<f64> = (0..60).map(|i| ((i * 37) % 101) as f64 + 0.25).collect();

        let fast = rolling_amount_stats(&timestamps, &amounts, 7 * DAY);
        let slow = naive_rolling(&timestamps, &amounts, 7 * DAY);
        for (a, b) in fast.iter().zip(&slow) {
            assert!((a.mean - b.mean).abs() < 1e-9, "{a:?} vs {b:?}");
            assert_eq!(a.max, b.max);
        }
    }

    #[test]
    fn empty_window_still_holds_the_current_row() {
        let stats = rolling_amount_stats(&[0, 10, 20], &[4.0, 8.0, 2.0], 0);
        assert_eq!(stats[1], WindowStats { mean: 8.0, max: 8.0 });
        assert_eq!(stats[2], WindowStats { mean: 2.0, max: 2.0 });
    }

    #[test]
    fn huge_window_covers_full_history() {
        let stats = rolling_amount_stats(&[-5 * DAY, 0, 400 * DAY], &[4.0, 8.0, 6.0], i64::MAX);
        assert_eq!(stats[2], WindowStats { mean: 6.0, max: 8.0 });
    }

    #[test]
    fn same_timestamp_rows_only_see_earlier_rows() {
        let stats = rolling_amount_stats(&[5, 5, 5], &[3.0, 9.0, 6.0], DAY);
        assert_eq!(stats[0].max, 3.0);
        assert_eq!(stats[1], WindowStats { mean: 6.0, max: 9.0 });
        assert_eq!(stats[2], WindowStats { mean: 6.0, max: 9.0 });
    }
}
