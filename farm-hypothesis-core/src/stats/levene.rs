use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use super::{check_finite, mean, median, StatsError};
use crate::dataset::Group;

/// Levene's test for equal variances, centred on group medians
/// (the Brown-Forsythe variant).
///
/// Returns the p-value of the F statistic with `(k - 1, N - k)` degrees of
/// freedom. Needs two groups and more observations than groups. When every
/// absolute deviation is zero the statistic is 0/0 and the test reports
/// [`StatsError::ZeroSpread`].
pub fn levene(groups: &[Group]) -> Result<f64, StatsError> {
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

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|group| {
            check_finite(&group.values, "variance test")?;
            let center = median(&group.values);
            Ok(group.values.iter().map(|x| (x - center).abs()).collect())
        })
        .collect::<Result<_, StatsError>>()?;

    let group_means: Vec<f64> = deviations.iter().map(|z| mean(z)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / n as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, m)| z.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, m)| z.iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;

    if within == 0.0 {
        return if between == 0.0 {
            Err(StatsError::ZeroSpread)
        } else {
            Ok(0.0)
        };
    }

    let statistic = (df_within * between) / (df_between * within);
    let f = FisherSnedecor::new(df_between, df_within)
        .map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(f.sf(statistic))
}
