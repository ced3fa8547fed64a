// Implied travel speed between consecutive transactions of one account.
//
// Distance is haversine on a sphere of mean Earth radius (IUGG R1), in
// metres. It differs from an ellipsoidal geodesic by up to ~0.5%.

use crate::config::PipelineConfig;
use crate::csv_reader::TransactionRecord;
use crate::error::{FeatureResult, IssueKind};
use crate::features::{Aggregator, Derived, DerivedColumn, FeatureContext, FeatureValue};

pub const SPEED_COLUMN: &str = "speed";
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

// Metres per second, or `None` when the speed is undefined: zero (or
// negative) elapsed time over a non-zero distance, or a non-finite result.
// A zero distance is speed 0 whatever the elapsed time.
pub fn implied_speed(distance_m: f64, elapsed_s: i64) -> Option<f64> {
    if distance_m == 0.0 {
        return Some(0.0);
    }
    if elapsed_s <= 0 {
        return None;
    }
    let speed = distance_m / elapsed_s as f64;
    speed.is_finite().then_some(speed)
}

fn speed_between(previous: &TransactionRecord, current: &TransactionRecord) -> Derived {
    let distance = haversine_m(
        previous.merchant_lat,
        previous.merchant_long,
        current.merchant_lat,
        current.merchant_long,
    );
    let elapsed = current.epoch_seconds() - previous.epoch_seconds();
    match implied_speed(distance, elapsed) {
        Some(speed) => Derived::float(speed),
        None => Derived::Excluded(
            IssueKind::UndefinedMetric,
            format!("speed undefined: {distance:.1} m in {elapsed} s"),
        ),
    }
}

pub struct Speed;

impl Aggregator for Speed {
    fn name(&self) -> &'static str {
        "speed"
    }

    fn columns(&self, _config: &PipelineConfig) -> Vec<String> {
        vec![SPEED_COLUMN.to_string()]
    }

    fn derive(&self, ctx: &FeatureContext<'_>) -> FeatureResult<Vec<DerivedColumn>> {
        let cells = ctx.per_account(|records| {
            let mut cells = Vec::with_capacity(records.len());
            if !records.is_empty() {
                cells.push(Derived::NoPrior);
            }
            cells.extend(records.windows(2).map(|pair| speed_between(pair[0], pair[1])));
            cells
        });
        Ok(vec![DerivedColumn::new(SPEED_COLUMN, cells).with_sentinel(FeatureValue::Float(0.0))])
    }
}
