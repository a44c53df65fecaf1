//! Hypothesis tests for comparing one measurement across groups.
//!
//! The entry point for callers is [`TestDecision::recommend`], which maps the
//! normality and variance-homogeneity diagnostics onto the test to run. The
//! tests themselves return `Result<PValue, StatsError>`; the only failure
//! turned into a p-value is constant input, reported as [`PValue::Degenerate`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the statistical routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// Fewer groups than the test needs.
    #[error("need at least {required} groups, found {found}")]
    TooFewGroups { required: usize, found: usize },

    /// Fewer observations than the test needs.
    #[error("need at least {required} observations, found {found}")]
    TooFewObservations { required: usize, found: usize },

    /// A group with one observation has leverage 1 under HC3.
    #[error("group '{0}' has a single observation")]
    SingletonGroup(String),

    /// A group with no spread makes the robust covariance singular.
    #[error("group '{0}' has zero variance")]
    ZeroVariance(String),

    /// Every deviation is zero, so the statistic is 0/0.
    #[error("statistic is undefined for zero-spread input")]
    ZeroSpread,

    /// Input or intermediate values are NaN or infinite.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// A reference distribution could not be constructed.
    #[error("invalid distribution parameters: {0}")]
    Distribution(String),
}

impl StatsError {
    /// Whether the error means there is not enough data, as opposed to a
    /// numerical failure.
    pub fn is_insufficient(&self) -> bool {
        matches!(
            self,
            StatsError::TooFewGroups { .. } | StatsError::TooFewObservations { .. }
        )
    }
}

/// A p-value produced by a test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PValue {
    Computed(f64),
    /// Every observation is identical; there is no difference to detect.
    Degenerate,
}

impl PValue {
    pub fn value(self) -> f64 {
        match self {
            PValue::Computed(p) => p,
            PValue::Degenerate => 1.0,
        }
    }
}

/// Which group-comparison test applies to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestDecision {
    Skip,
    Anova,
    Welch,
    Kruskal,
}

impl TestDecision {
    /// Choose a test from the normality and variance-homogeneity p-values.
    ///
    /// Undefined normality skips the column. Normal data uses ANOVA unless
    /// the variances are shown to differ, in which case Welch is used.
    /// Non-normal data uses Kruskal-Wallis.
    pub fn recommend(normality_p: Option<f64>, variance_p: Option<f64>, alpha: f64) -> Self {
        match (normality_p, variance_p) {
            (None, _) => TestDecision::Skip,
            (Some(normal), None) if normal > alpha => TestDecision::Anova,
            (Some(normal), Some(variance)) if normal > alpha && variance > alpha => {
                TestDecision::Anova
            }
            (Some(normal), Some(_)) if normal > alpha => TestDecision::Welch,
            (Some(_), _) => TestDecision::Kruskal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestDecision::Skip => "SKIP",
            TestDecision::Anova => "ANOVA",
            TestDecision::Welch => "Welch",
            TestDecision::Kruskal => "Kruskal",
        }
    }
}

impl fmt::Display for TestDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running the selected test for one column and grouping field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Computed { p_value: f64 },
    /// Constant input, reported as p = 1.0.
    Degenerate,
    NotEnoughData,
    Failed { error: String },
}

impl TestOutcome {
    /// The p-value, when one exists.
    pub fn p_value(&self) -> Option<f64> {
        match self {
            TestOutcome::Computed { p_value } => Some(*p_value),
            TestOutcome::Degenerate => Some(1.0),
            TestOutcome::NotEnoughData | TestOutcome::Failed { .. } => None,
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value().is_some_and(|p| p < alpha)
    }
}

impl From<Result<PValue, StatsError>> for TestOutcome {
    fn from(result: Result<PValue, StatsError>) -> Self {
        match result {
            Ok(PValue::Computed(p_value)) => TestOutcome::Computed { p_value },
            Ok(PValue::Degenerate) => TestOutcome::Degenerate,
            Err(e) if e.is_insufficient() => TestOutcome::NotEnoughData,
            Err(e) => TestOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sum_sq_dev(values: &[f64], center: f64) -> f64 {
    values.iter().map(|x| (x - center).powi(2)).sum()
}

pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Midranks (1-based) of `values`, and the tie term `sum(t^3 - t)` over
/// every run of equal values.
pub(crate) fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let midrank = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            ranks[index] = midrank;
        }
        let t = (end - start + 1) as f64;
        ties += t * t * t - t;
        start = end + 1;
    }
    (ranks, ties)
}

pub(crate) fn check_finite(values: &[f64], what: &'static str) -> Result<(), StatsError> {
    if values.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(StatsError::NonFinite(what))
    }
}

mod anova;
mod dunn;
mod kruskal;
mod levene;
mod normality;
mod tukey;

pub use anova::{one_way_anova, welch_anova_hc3, AnovaTable};
pub use dunn::{dunn_bonferroni, DunnMatrix};
pub use kruskal::kruskal_wallis;
pub use levene::levene;
pub use normality::{shapiro_wilk, ShapiroWilk};
pub use tukey::{ptukey, qtukey, tukey_hsd, TukeyComparison, TukeyHsd};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_skip_without_normality() {
        assert_eq!(
            TestDecision::recommend(None, Some(0.5), 0.05),
            TestDecision::Skip
        );
        assert_eq!(
            TestDecision::recommend(None, None, 0.05),
            TestDecision::Skip
        );
    }

    #[test]
    fn test_recommend_anova() {
        assert_eq!(
            TestDecision::recommend(Some(0.3), Some(0.2), 0.05),
            TestDecision::Anova
        );
        assert_eq!(
            TestDecision::recommend(Some(0.3), None, 0.05),
            TestDecision::Anova
        );
    }

    #[test]
    fn test_recommend_welch_on_unequal_variances() {
        assert_eq!(
            TestDecision::recommend(Some(0.3), Some(0.01), 0.05),
            TestDecision::Welch
        );
        // Boundary: a variance p of exactly alpha counts as unequal.
        assert_eq!(
            TestDecision::recommend(Some(0.3), Some(0.05), 0.05),
            TestDecision::Welch
        );
    }

    #[test]
    fn test_recommend_kruskal_on_non_normal() {
        assert_eq!(
            TestDecision::recommend(Some(0.01), Some(0.9), 0.05),
            TestDecision::Kruskal
        );
        assert_eq!(
            TestDecision::recommend(Some(0.05), None, 0.05),
            TestDecision::Kruskal
        );
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(TestDecision::Skip.to_string(), "SKIP");
        assert_eq!(TestDecision::Anova.to_string(), "ANOVA");
        assert_eq!(TestDecision::Welch.to_string(), "Welch");
        assert_eq!(TestDecision::Kruskal.to_string(), "Kruskal");
    }

    #[test]
    fn test_outcome_from_result() {
        assert_eq!(
            TestOutcome::from(Ok(PValue::Computed(0.01))),
            TestOutcome::Computed { p_value: 0.01 }
        );
        assert_eq!(
            TestOutcome::from(Ok(PValue::Degenerate)).p_value(),
            Some(1.0)
        );
        assert_eq!(
            TestOutcome::from(Err(StatsError::TooFewGroups {
                required: 2,
                found: 1
            })),
            TestOutcome::NotEnoughData
        );
        let failed = TestOutcome::from(Err(StatsError::SingletonGroup("A".to_string())));
        assert!(matches!(failed, TestOutcome::Failed { .. }));
        assert_eq!(failed.p_value(), None);
    }

    #[test]
    fn test_outcome_significance() {
        assert!(TestOutcome::Computed { p_value: 0.01 }.is_significant(0.05));
        assert!(!TestOutcome::Computed { p_value: 0.05 }.is_significant(0.05));
        assert!(!TestOutcome::Degenerate.is_significant(0.05));
        assert!(!TestOutcome::NotEnoughData.is_significant(0.05));
    }

    #[test]
    fn test_rank_with_ties() {
        let (ranks, ties) = rank_with_ties(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(ties, 6.0);

        let (ranks, ties) = rank_with_ties(&[5.0, 4.0]);
        assert_eq!(ranks, vec![2.0, 1.0]);
        assert_eq!(ties, 0.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }
}
