//! Reduction of per-review score pairs into one overall score in `[0, 10]`.
//!
//! Every policy maps all-5 input to 10, never decreases when a single score
//! rises, and returns the same value for any ordering of the same pairs.

use crate::error::AppError;
use crate::model::ScorePair;

pub const MAX_OVERALL: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringPolicy {
    /// `10 * mean_food * mean_service / 25`.
    #[default]
    MeanProduct,
    /// `sum(sqrt(food^2 * service)) / (N * sqrt(125)) * 10` rounded to two decimals,
    /// food weighted more heavily.
    GeometricMean,
}

impl ScoringPolicy {
    pub fn aggregate(self, pairs: &[ScorePair]) -> Result<f64, AppError> {
        if pairs.is_empty() {
            return Err(AppError::EmptyInput);
        }
        let overall = match self {
            ScoringPolicy::MeanProduct => mean_product(pairs),
            ScoringPolicy::GeometricMean => geometric_mean(pairs),
        };
        Ok(overall.clamp(0.0, MAX_OVERALL))
    }

    pub fn name(self) -> &'static str {
        match self {
            ScoringPolicy::MeanProduct => "mean-product",
            ScoringPolicy::GeometricMean => "geometric-mean",
        }
    }
}

impl std::str::FromStr for ScoringPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean-product" | "mean_product" => Ok(ScoringPolicy::MeanProduct),
            "geometric-mean" | "geometric_mean" => Ok(ScoringPolicy::GeometricMean),
            other => Err(AppError::Config(format!(
                "unknown scoring policy '{other}' (expected 'mean-product' or 'geometric-mean')"
            ))),
        }
    }
}

// Integer sums keep the result independent of pair order.
fn mean_product(pairs: &[ScorePair]) -> f64 {
    let food: u128 = pairs.iter().map(|p| u128::from(p.food_score.get())).sum();
    let service: u128 = pairs
        .iter()
        .map(|p| u128::from(p.customer_service_score.get()))
        .sum();
    scaled_product(food, service, pairs.len() as u128)
}

// Sums are at most 5n, so u128 products cannot overflow for any slice length.
fn scaled_product(food_sum: u128, service_sum: u128, n: u128) -> f64 {
    MAX_OVERALL * (food_sum * service_sum) as f64 / (25 * n * n) as f64
}

/// Rounded to two decimals.
fn geometric_mean(pairs: &[ScorePair]) -> f64 {
    let mut ordered: Vec<(u8, u8)> = pairs
        .iter()
        .map(|p| (p.food_score.get(), p.customer_service_score.get()))
        .collect();
    ordered.sort_unstable();

    let n = ordered.len() as f64;
    let norm = n * 125f64.sqrt();
    let total: f64 = ordered
        .iter()
        .map(|&(food, service)| {
            let food = f64::from(food);
            (food * food * f64::from(service)).sqrt()
        })
        .sum();
    (total / norm * MAX_OVERALL * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(u8, u8)]) -> Vec<ScorePair> {
        raw.iter()
            .map(|&(f, s)| ScorePair::from_raw(f, s).unwrap())
            .collect()
    }

    const POLICIES: [ScoringPolicy; 2] = [ScoringPolicy::MeanProduct, ScoringPolicy::GeometricMean];

    #[test]
    fn mean_product_reference_values() {
        let policy = ScoringPolicy::MeanProduct;
        assert_eq!(policy.aggregate(&pairs(&[(5, 5)])).unwrap(), 10.0);
        assert!((policy.aggregate(&pairs(&[(1, 1)])).unwrap() - 0.4).abs() < 1e-9);
        assert!((policy.aggregate(&pairs(&[(3, 2)])).unwrap() - 2.4).abs() < 1e-9);
        assert_eq!(policy.aggregate(&pairs(&[(5, 5), (5, 5), (5, 5)])).unwrap(), 10.0);
        // mean food 4, mean service 3
        assert!((policy.aggregate(&pairs(&[(5, 2), (3, 4)])).unwrap() - 4.8).abs() < 1e-9);
    }

    #[test]
    fn geometric_mean_reference_values() {
        let policy = ScoringPolicy::GeometricMean;
        assert_eq!(policy.aggregate(&pairs(&[(5, 5)])).unwrap(), 10.0);
        // 10 / sqrt(125)
        assert_eq!(policy.aggregate(&pairs(&[(1, 1)])).unwrap(), 0.89);
        // sqrt(9 * 2) / sqrt(125) * 10
        assert_eq!(policy.aggregate(&pairs(&[(3, 2)])).unwrap(), 3.79);
        // (sqrt(25 * 1) + sqrt(1 * 5)) / (2 * sqrt(125)) * 10
        assert_eq!(policy.aggregate(&pairs(&[(5, 1), (1, 5)])).unwrap(), 3.24);
    }

    #[test]
    fn mean_product_handles_huge_review_counts() {
        let n = 10_000_000_000u128;
        assert_eq!(scaled_product(5 * n, 5 * n, n), 10.0);
        assert!((scaled_product(3 * n, 2 * n, n) - 2.4).abs() < 1e-9);
    }

    #[test]
    fn food_weighs_more_under_geometric_mean() {
        let policy = ScoringPolicy::GeometricMean;
        let strong_food = policy.aggregate(&pairs(&[(5, 1)])).unwrap();
        let strong_service = policy.aggregate(&pairs(&[(1, 5)])).unwrap();
        assert!(strong_food > strong_service);
    }

    #[test]
    fn empty_input_is_rejected() {
        for policy in POLICIES {
            assert!(matches!(policy.aggregate(&[]), Err(AppError::EmptyInput)));
        }
    }

    #[test]
    fn order_does_not_change_result() {
        let forward = pairs(&[(1, 5), (4, 2), (3, 3), (5, 1), (2, 4), (4, 4), (1, 2)]);
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut rotated = forward.clone();
        rotated.rotate_left(3);
        for policy in POLICIES {
            let expected = policy.aggregate(&forward).unwrap();
            assert_eq!(policy.aggregate(&reversed).unwrap().to_bits(), expected.to_bits());
            assert_eq!(policy.aggregate(&rotated).unwrap().to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn raising_any_single_score_never_lowers_result() {
        let base = [(2u8, 3u8), (4, 1), (3, 5)];
        for policy in POLICIES {
            let before = policy.aggregate(&pairs(&base)).unwrap();
            for i in 0..base.len() {
                for axis in 0..2 {
                    let mut raised = base;
                    let slot = if axis == 0 { &mut raised[i].0 } else { &mut raised[i].1 };
                    if *slot == 5 {
                        continue;
                    }
                    *slot += 1;
                    let after = policy.aggregate(&pairs(&raised)).unwrap();
                    assert!(after >= before, "{policy:?}: {raised:?} scored {after} < {before}");
                }
            }
        }
    }

    #[test]
    fn results_stay_within_bounds() {
        for policy in POLICIES {
            for food in 1..=5 {
                for service in 1..=5 {
                    let score = policy.aggregate(&pairs(&[(food, service)])).unwrap();
                    assert!((0.0..=MAX_OVERALL).contains(&score), "{policy:?} {food},{service}");
                }
            }
        }
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "geometric-mean".parse::<ScoringPolicy>().unwrap(),
            ScoringPolicy::GeometricMean
        );
        assert_eq!(
            "MEAN_PRODUCT".parse::<ScoringPolicy>().unwrap(),
            ScoringPolicy::MeanProduct
        );
        assert!("median".parse::<ScoringPolicy>().is_err());
    }
}
