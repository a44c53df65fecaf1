use statrs::distribution::{ChiSquared, ContinuousCDF};

use super::{check_finite, rank_with_ties, PValue, StatsError};
use crate::dataset::Group;

/// Kruskal-Wallis H test on already-filtered groups.
///
/// H is tie-corrected and compared against chi-square with `k - 1`
/// degrees of freedom. When every observation is identical the ranks carry
/// no information and the result is [`PValue::Degenerate`].
pub fn kruskal_wallis(groups: &[Group]) -> Result<PValue, StatsError> {
    let k = groups.len();
    if k < 2 {
        return Err(StatsError::TooFewGroups {
            required: 2,
            found: k,
        });
    }
    if let Some(empty) = groups.iter().find(|g| g.is_empty()) {
        return Err(StatsError::TooFewObservations {
            required: 1,
            found: empty.len(),
        });
    }

    let all: Vec<f64> = groups
        .iter()
        .flat_map(|g| g.values.iter().copied())
        .collect();
    check_finite(&all, "rank-sum input")?;
    if all.iter().all(|v| *v == all[0]) {
        return Ok(PValue::Degenerate);
    }

    let n = all.len() as f64;
    let (ranks, ties) = rank_with_ties(&all);

    let mut offset = 0;
    let mut rank_term = 0.0;
    for group in groups {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        rank_term += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }

    let h = 12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0);
    let correction = 1.0 - ties / (n * n * n - n);
    let statistic = h / correction;
    if !statistic.is_finite() {
        return Err(StatsError::NonFinite("Kruskal-Wallis statistic"));
    }

    let chi2 =
        ChiSquared::new((k - 1) as f64).map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(PValue::Computed(chi2.sf(statistic.max(0.0))))
}
