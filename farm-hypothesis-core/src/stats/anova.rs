use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use super::{check_finite, mean, sum_sq_dev, PValue, StatsError};
use crate::dataset::Group;

/// Group-effect row of a one-factor analysis-of-variance table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnovaTable {
    /// F statistic for the group effect (NaN for constant input).
    pub statistic: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub p_value: PValue,
}

impl AnovaTable {
    fn degenerate(df_between: f64, df_within: f64) -> Self {
        Self {
            statistic: f64::NAN,
            df_between,
            df_within,
            p_value: PValue::Degenerate,
        }
    }
}

/// Shape checks shared by both ANOVA variants; returns `(k, N)`.
fn validate(groups: &[Group]) -> Result<(usize, usize), StatsError> {
    let k = groups.len();
    if k < 2 {
        return Err(StatsError::TooFewGroups {
            required: 2,
            found: k,
        });
    }
    let n: usize = groups.iter().map(Group::len).sum();
    if n <= k || groups.iter().any(Group::is_empty) {
        return Err(StatsError::TooFewObservations {
            required: k + 1,
            found: n,
        });
    }
    for group in groups {
        check_finite(&group.values, "ANOVA input")?;
    }
    Ok((k, n))
}

fn all_identical(groups: &[Group]) -> bool {
    let mut values = groups.iter().flat_map(|g| g.values.iter());
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

fn f_upper_tail(statistic: f64, df_between: f64, df_within: f64) -> Result<f64, StatsError> {
    if statistic.is_nan() {
        return Err(StatsError::NonFinite("F statistic"));
    }
    if statistic == f64::INFINITY {
        return Ok(0.0);
    }
    let f = FisherSnedecor::new(df_between, df_within)
        .map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(f.sf(statistic))
}

/// Classical one-way ANOVA of a measurement on a categorical factor.
///
/// With a single factor the type-II table reduces to `F = MSB / MSE` on
/// `(k - 1, N - k)` degrees of freedom. Every group is used regardless of
/// size. Constant input is degenerate; zero residual variance with
/// separated means gives `p = 0`.
pub fn one_way_anova(groups: &[Group]) -> Result<AnovaTable, StatsError> {
    let (k, n) = validate(groups)?;
    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;

    if all_identical(groups) {
        return Ok(AnovaTable::degenerate(df_between, df_within));
    }

    let all: Vec<f64> = groups
        .iter()
        .flat_map(|g| g.values.iter().copied())
        .collect();
    let grand_mean = mean(&all);
    let total = sum_sq_dev(&all, grand_mean);

    let mut between = 0.0;
    let mut within = 0.0;
    for group in groups {
        let group_mean = group.mean();
        between += group.len() as f64 * (group_mean - grand_mean).powi(2);
        within += sum_sq_dev(&group.values, group_mean);
    }

    let statistic = if within <= f64::EPSILON * total {
        f64::INFINITY
    } else {
        (between / df_between) / (within / df_within)
    };
    let p = f_upper_tail(statistic, df_between, df_within)?;

    Ok(AnovaTable {
        statistic,
        df_between,
        df_within,
        p_value: PValue::Computed(p),
    })
}

/// One-way ANOVA with an HC3 heteroscedasticity-consistent covariance.
///
/// The group effect is tested with a Wald F statistic on the same
/// `(k - 1, N - k)` degrees of freedom as the classical table. HC3 scales
/// each squared residual by `1 / (1 - h)^2`, where the leverage `h` of an
/// observation is `1 / n_g` for its group, so the covariance of a group mean
/// is `SS_g / (n_g - 1)^2`.
///
/// A group with a single observation has leverage 1 and fails the test. At
/// most one group may have zero spread.
pub fn welch_anova_hc3(groups: &[Group]) -> Result<AnovaTable, StatsError> {
    let (k, n) = validate(groups)?;
    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;

    if all_identical(groups) {
        return Ok(AnovaTable::degenerate(df_between, df_within));
    }
    if let Some(single) = groups.iter().find(|g| g.len() == 1) {
        return Err(StatsError::SingletonGroup(single.label.clone()));
    }

    let means: Vec<f64> = groups.iter().map(Group::mean).collect();
    let variances: Vec<f64> = groups
        .iter()
        .zip(&means)
        .map(|(g, &m)| sum_sq_dev(&g.values, m) / ((g.len() - 1) as f64).powi(2))
        .collect();

    let mut exact = groups
        .iter()
        .zip(&means)
        .zip(&variances)
        .filter(|(_, v)| **v == 0.0)
        .map(|((g, &m), _)| (g, m));
    let pinned = exact.next();
    if let Some((second, _)) = exact.next() {
        return Err(StatsError::ZeroVariance(second.label.clone()));
    }

    // A zero-variance mean is known exactly and anchors the contrast;
    // otherwise the precision-weighted mean does.
    let wald = match pinned {
        Some((_, anchor)) => means
            .iter()
            .zip(&variances)
            .filter(|(_, v)| **v > 0.0)
            .map(|(m, v)| (m - anchor).powi(2) / v)
            .sum::<f64>(),
        None => {
            let weights: Vec<f64> = variances.iter().map(|v| 1.0 / v).collect();
            let total_weight: f64 = weights.iter().sum();
            let center =
                weights.iter().zip(&means).map(|(w, m)| w * m).sum::<f64>() / total_weight;
            weights
                .iter()
                .zip(&means)
                .map(|(w, m)| w * (m - center).powi(2))
                .sum::<f64>()
        }
    };

    let statistic = wald / df_between;
    let p = f_upper_tail(statistic, df_between, df_within)?;

    Ok(AnovaTable {
        statistic,
        df_between,
        df_within,
        p_value: PValue::Computed(p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(label: &str, values: &[f64]) -> Group {
        Group::new(label, values.to_vec())
    }

    fn p(table: &AnovaTable) -> f64 {
        table.p_value.value()
    }

    #[test]
    fn test_separated_groups() {
        let groups = [
            group("A", &[10.0, 11.0, 12.0, 13.0]),
            group("B", &[50.0, 51.0, 52.0, 53.0]),
        ];
        let table = one_way_anova(&groups).unwrap();

        assert!((table.statistic - 1920.0).abs() < 1e-9);
        assert_eq!(table.df_between, 1.0);
        assert_eq!(table.df_within, 6.0);
        assert!(p(&table) < 1e-7);
    }

    #[test]
    fn test_three_groups_reference() {
        let groups = [
            group("A", &[4.1, 5.2, 6.3, 5.0]),
            group("B", &[6.0, 7.1, 5.9, 6.8]),
            group("C", &[5.5, 5.0, 6.1, 5.7]),
        ];
        let table = one_way_anova(&groups).unwrap();

        assert!((table.statistic - 3.83222).abs() < 1e-4);
        assert!((p(&table) - 0.06252).abs() < 1e-4);
    }

    #[test]
    fn test_constant_input_is_degenerate() {
        let groups = [group("A", &[2.0, 2.0]), group("B", &[2.0, 2.0, 2.0])];
        let table = one_way_anova(&groups).unwrap();
        assert_eq!(table.p_value, PValue::Degenerate);
        assert_eq!(p(&table), 1.0);
    }

    #[test]
    fn test_zero_residual_with_distinct_means() {
        let groups = [group("A", &[1.0, 1.0]), group("B", &[3.0, 3.0])];
        let table = one_way_anova(&groups).unwrap();
        assert_eq!(table.p_value, PValue::Computed(0.0));
    }

    #[test]
    fn test_single_level_is_insufficient() {
        let groups = [group("A", &[1.0, 2.0, 3.0])];
        let err = one_way_anova(&groups).unwrap_err();
        assert!(err.is_insufficient());
    }

    #[test]
    fn test_no_residual_degrees_of_freedom() {
        let groups = [group("A", &[1.0]), group("B", &[2.0])];
        let err = one_way_anova(&groups).unwrap_err();
        assert_eq!(
            err,
            StatsError::TooFewObservations {
                required: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_hc3_two_groups_reference() {
        let groups = [
            group("A", &[1.0, 2.0, 3.0, 4.0]),
            group("B", &[10.0, 14.0, 18.0, 22.0]),
        ];
        let table = welch_anova_hc3(&groups).unwrap();

        assert!((table.statistic - 19.29706).abs() < 1e-4);
        assert!((p(&table) - 0.004604).abs() < 1e-5);
        // The classical table is more confident on the same data.
        assert!(p(&one_way_anova(&groups).unwrap()) < p(&table));
    }

    #[test]
    fn test_hc3_three_groups_reference() {
        let groups = [
            group("A", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            group("B", &[10.0, 14.0, 18.0, 22.0]),
            group("C", &[4.0, 6.0, 9.0, 3.0, 5.0, 8.0]),
        ];
        let table = welch_anova_hc3(&groups).unwrap();

        assert!((table.statistic - 10.06372).abs() < 1e-4);
        assert!((p(&table) - 0.0027154).abs() < 1e-5);
    }

    #[test]
    fn test_hc3_singleton_group_fails() {
        let groups = [group("A", &[1.0, 2.0, 3.0]), group("lonely", &[5.0])];
        assert_eq!(
            welch_anova_hc3(&groups),
            Err(StatsError::SingletonGroup("lonely".to_string()))
        );
    }

    #[test]
    fn test_hc3_one_constant_group_anchors_contrast() {
        let groups = [
            group("A", &[5.0, 5.0, 5.0, 5.0]),
            group("B", &[1.0, 2.0, 3.0, 4.0]),
        ];
        let table = welch_anova_hc3(&groups).unwrap();

        // (5 - 2.5)^2 / (5 / 9)
        assert!((table.statistic - 11.25).abs() < 1e-9);
    }

    #[test]
    fn test_hc3_two_constant_groups_fail() {
        let groups = [
            group("A", &[5.0, 5.0]),
            group("B", &[7.0, 7.0]),
            group("C", &[1.0, 2.0]),
        ];
        assert_eq!(
            welch_anova_hc3(&groups),
            Err(StatsError::ZeroVariance("B".to_string()))
        );
    }

    #[test]
    fn test_hc3_constant_input_is_degenerate() {
        let groups = [group("A", &[4.0, 4.0]), group("B", &[4.0, 4.0])];
        let table = welch_anova_hc3(&groups).unwrap();
        assert_eq!(table.p_value, PValue::Degenerate);
    }
}
