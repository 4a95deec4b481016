// Risk estimator - converts confidence intervals into failure probabilities
//
// The forecast distribution at each step is treated as approximately normal
// around the point estimate, with sigma recovered from the interval width:
// sigma = (upper - lower) / (2 * z), z being the two-tailed z-score for the
// forecast's confidence level. Failure probability is then the normal tail
// mass beyond the configured threshold.
use crate::domain::forecast::{Forecast, ForecastPoint};
use crate::domain::risk::{RiskPoint, TailSide};
use crate::error::PipelineError;

/// Sigma below this is treated as exactly zero: the distribution collapses
/// to a hard step at the point estimate.
const SIGMA_FLOOR: f64 = 1e-12;

pub fn estimate(
    forecast: &Forecast,
    failure_threshold: f64,
    side: TailSide,
) -> Result<Vec<RiskPoint>, PipelineError> {
    let z = two_tailed_z(forecast.confidence_level)?;

    Ok(forecast
        .points
        .iter()
        .map(|p| RiskPoint::new(p.timestamp, point_risk(p, failure_threshold, side, z)))
        .collect())
}

fn point_risk(point: &ForecastPoint, threshold: f64, side: TailSide, z: f64) -> f64 {
    let sigma = point.interval_width() / (2.0 * z);

    if sigma < SIGMA_FLOOR {
        return step_risk(point.point, threshold, side);
    }

    match side {
        TailSide::Lower => normal_cdf((threshold - point.point) / sigma),
        TailSide::Upper => 1.0 - normal_cdf((threshold - point.point) / sigma),
        TailSide::TwoSided => {
            let half_width = (point.point - threshold).abs();
            2.0 * (1.0 - normal_cdf(half_width / sigma))
        }
    }
}

/// Degenerate case: zero uncertainty means the probability is exactly 0 or 1,
/// with a threshold touch counting as failure.
fn step_risk(point: f64, threshold: f64, side: TailSide) -> f64 {
    let crossed = match side {
        TailSide::Lower => point <= threshold,
        TailSide::Upper => point >= threshold,
        TailSide::TwoSided => point == threshold,
    };
    if crossed { 1.0 } else { 0.0 }
}

/// Two-tailed z-score for a confidence level in (0, 1), e.g. 1.959964 for 0.95.
pub fn two_tailed_z(confidence_level: f64) -> Result<f64, PipelineError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(PipelineError::InvalidConfiguration(format!(
            "confidence_level must be in (0, 1), got {confidence_level}"
        )));
    }
    Ok(normal_quantile((1.0 + confidence_level) / 2.0))
}

/// Standard normal CDF via the error function.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + libm::erf(z / std::f64::consts::SQRT_2))
}

/// Inverse standard normal CDF, Acklam's rational approximation
/// (relative error below 1.15e-9 across (0, 1)).
pub fn normal_quantile(p: f64) -> f64 {
    debug_assert!(p > 0.0 && p < 1.0);

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::{Forecast, ForecastOrigin, ForecastPoint};
    use chrono::{TimeZone, Utc};

    fn single_point_forecast(point: f64, sigma: f64, confidence: f64) -> Forecast {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let z = two_tailed_z(confidence).unwrap();
        let fp = ForecastPoint::new(ts, point, point - z * sigma, point + z * sigma, confidence);
        Forecast::new(vec![fp], ForecastOrigin::Live, confidence)
    }

    #[test]
    fn test_two_tailed_z_at_95() {
        let z = two_tailed_z(0.95).unwrap();
        assert!((z - 1.959964).abs() < 1e-5, "z was {z}");
    }

    #[test]
    fn test_two_tailed_z_rejects_out_of_range() {
        assert!(two_tailed_z(0.0).is_err());
        assert!(two_tailed_z(1.0).is_err());
        assert!(two_tailed_z(-0.5).is_err());
        assert!(two_tailed_z(1.5).is_err());
    }

    #[test]
    fn test_sigma_round_trips_through_interval() {
        // Rebuilding the interval from point +/- z*sigma must reproduce the
        // original bounds, for several confidence levels.
        for confidence in [0.5, 0.8, 0.95, 0.99] {
            let z = two_tailed_z(confidence).unwrap();
            let (point, sigma) = (0.55, 0.012);
            let forecast = single_point_forecast(point, sigma, confidence);
            let fp = &forecast.points[0];

            let recovered_sigma = fp.interval_width() / (2.0 * z);
            assert!((recovered_sigma - sigma).abs() < 1e-12);
            assert!((fp.lower - (point - z * sigma)).abs() < 1e-12);
            assert!((fp.upper - (point + z * sigma)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_risk_monotone_in_gap_for_fixed_sigma() {
        let threshold = 0.45;
        let mut last = -1.0;
        // Point estimate walking down toward and past the threshold
        for i in 0..40 {
            let point = 0.65 - 0.01 * i as f64;
            let forecast = single_point_forecast(point, 0.02, 0.95);
            let risk = estimate(&forecast, threshold, TailSide::Lower).unwrap();
            let p = risk[0].failure_probability;
            assert!(p >= last, "risk decreased: {p} < {last} at point {point}");
            last = p;
        }
    }

    #[test]
    fn test_risk_monotone_in_sigma_for_fixed_gap() {
        // Point above a lower threshold: widening uncertainty raises risk
        let threshold = 0.45;
        let mut last = -1.0;
        for i in 1..50 {
            let sigma = 0.001 * i as f64;
            let forecast = single_point_forecast(0.55, sigma, 0.95);
            let risk = estimate(&forecast, threshold, TailSide::Lower).unwrap();
            let p = risk[0].failure_probability;
            assert!(p >= last, "risk decreased: {p} < {last} at sigma {sigma}");
            last = p;
        }
    }

    #[test]
    fn test_zero_sigma_is_hard_step() {
        let above = single_point_forecast(0.55, 0.0, 0.95);
        let risk = estimate(&above, 0.45, TailSide::Lower).unwrap();
        assert_eq!(risk[0].failure_probability, 0.0);

        let below = single_point_forecast(0.40, 0.0, 0.95);
        let risk = estimate(&below, 0.45, TailSide::Lower).unwrap();
        assert_eq!(risk[0].failure_probability, 1.0);

        // Exactly on the threshold counts as failure
        let touching = single_point_forecast(0.45, 0.0, 0.95);
        let risk = estimate(&touching, 0.45, TailSide::Lower).unwrap();
        assert_eq!(risk[0].failure_probability, 1.0);
    }

    #[test]
    fn test_risk_never_nan_for_positive_sigma() {
        for sigma in [1e-9, 1e-3, 0.5, 100.0] {
            for threshold in [-10.0, 0.0, 0.45, 0.55, 10.0] {
                for side in [TailSide::Lower, TailSide::Upper, TailSide::TwoSided] {
                    let forecast = single_point_forecast(0.55, sigma, 0.95);
                    let risk = estimate(&forecast, threshold, side).unwrap();
                    let p = risk[0].failure_probability;
                    assert!(p.is_finite() && (0.0..=1.0).contains(&p), "p = {p}");
                }
            }
        }
    }

    #[test]
    fn test_upper_tail_mirrors_lower_tail() {
        let forecast = single_point_forecast(0.55, 0.02, 0.95);
        let lower = estimate(&forecast, 0.50, TailSide::Lower).unwrap()[0].failure_probability;
        let upper = estimate(&forecast, 0.60, TailSide::Upper).unwrap()[0].failure_probability;
        // Symmetric gaps around the point estimate give symmetric tails
        assert!((lower - upper).abs() < 1e-12);
    }

    #[test]
    fn test_two_sided_doubles_symmetric_tail() {
        let forecast = single_point_forecast(0.55, 0.02, 0.95);
        let one_tail = estimate(&forecast, 0.50, TailSide::Lower).unwrap()[0].failure_probability;
        let two_sided = estimate(&forecast, 0.50, TailSide::TwoSided).unwrap()[0].failure_probability;
        assert!((two_sided - 2.0 * one_tail).abs() < 1e-12);
    }

    #[test]
    fn test_normal_quantile_matches_known_values() {
        assert!((normal_quantile(0.5)).abs() < 1e-9);
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-5);
        assert!((normal_quantile(0.995) - 2.575829).abs() < 1e-5);
        // CDF and quantile invert each other in the tails too
        for p in [0.001, 0.01, 0.2, 0.8, 0.99, 0.999] {
            let round = normal_cdf(normal_quantile(p));
            assert!((round - p).abs() < 1e-8, "p {p} round-tripped to {round}");
        }
    }
}
