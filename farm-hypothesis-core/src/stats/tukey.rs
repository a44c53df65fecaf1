use std::f64::consts::{LN_2, PI};
use std::fmt;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::gamma::ln_gamma;

use super::{check_finite, sum_sq_dev, StatsError};
use crate::dataset::Group;

// Gauss-Legendre nodes and weights (positive half) for the inner integral
// over the range of `cc` normals (order 12) and the outer integral over the
// chi distribution of the standard error (order 16). Copenhaver & Holland
// (1988), as used by R's ptukey.
const XLEG: [f64; 6] = [
    0.981_560_634_246_719_3,
    0.904_117_256_370_474_9,
    0.769_902_674_194_304_7,
    0.587_317_954_286_617_4,
    0.367_831_498_998_180_2,
    0.125_233_408_511_468_9,
];
const ALEG: [f64; 6] = [
    0.047_175_336_386_511_83,
    0.106_939_325_995_318_43,
    0.160_078_328_543_346_23,
    0.203_167_426_723_065_92,
    0.233_492_536_538_354_8,
    0.249_147_045_813_402_8,
];
const XLEGQ: [f64; 8] = [
    0.989_400_934_991_649_9,
    0.944_575_023_073_232_6,
    0.865_631_202_387_831_7,
    0.755_404_408_355_003,
    0.617_876_244_402_643_7,
    0.458_016_777_657_227_4,
    0.281_603_550_779_258_9,
    0.095_012_509_837_637_44,
];
const ALEGQ: [f64; 8] = [
    0.027_152_459_411_754_095,
    0.062_253_523_938_647_89,
    0.095_158_511_682_492_78,
    0.124_628_971_255_533_87,
    0.149_595_988_816_576_73,
    0.169_156_519_395_002_54,
    0.182_603_415_044_923_6,
    0.189_450_610_455_068_5,
];

/// Probability that the range of `cc` standard normals is below `w`.
fn wprob(normal: &Normal, w: f64, cc: f64) -> f64 {
    const UPPER: f64 = 8.0;
    let half_w = w * 0.5;
    if half_w >= UPPER {
        return 1.0;
    }

    let mut pr_w = 2.0 * normal.cdf(half_w) - 1.0;
    pr_w = if pr_w >= (-50.0 / cc).exp() {
        pr_w.powf(cc)
    } else {
        0.0
    };

    let intervals = if w > 3.0 { 2 } else { 3 };
    let step = (UPPER - half_w) / intervals as f64;
    let cc1 = cc - 1.0;
    let mut lower = half_w;
    let mut upper = lower + step;
    let mut integral = 0.0;

    for _ in 0..intervals {
        let center = 0.5 * (upper + lower);
        let half_width = 0.5 * (upper - lower);
        let mut interval_sum = 0.0;

        for jj in 1..=12 {
            let (j, node) = if jj > 6 {
                let j = 12 - jj;
                (j, XLEG[j])
            } else {
                let j = jj - 1;
                (j, -XLEG[j])
            };
            let ac = center + half_width * node;
            let exponent = ac * ac;
            if exponent > 60.0 {
                break;
            }
            let inner = normal.cdf(ac) - normal.cdf(ac - w);
            if inner >= (-30.0 / cc1).exp() {
                interval_sum += ALEG[j] * (-0.5 * exponent).exp() * inner.powf(cc1);
            }
        }
        integral += interval_sum * (2.0 * half_width * cc / (2.0 * PI).sqrt());
        lower = upper;
        upper += step;
    }

    pr_w += integral;
    if pr_w <= (-30.0f64).exp() {
        return 0.0;
    }
    pr_w.min(1.0)
}

/// Cumulative distribution of the studentized range for `groups` means and
/// `df` error degrees of freedom.
pub fn ptukey(q: f64, groups: f64, df: f64) -> Result<f64, StatsError> {
    if df < 2.0 || groups < 2.0 || q.is_nan() {
        return Err(StatsError::Distribution(format!(
            "studentized range needs groups >= 2 and df >= 2, got groups = {groups}, df = {df}"
        )));
    }
    if q <= 0.0 {
        return Ok(0.0);
    }
    if q.is_infinite() {
        return Ok(1.0);
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))?;
    if df > 25_000.0 {
        return Ok(wprob(&normal, q, groups));
    }

    let f2 = df * 0.5;
    let f21 = f2 - 1.0;
    let ff4 = df * 0.25;
    let ulen: f64 = if df <= 100.0 {
        1.0
    } else if df <= 800.0 {
        0.5
    } else if df <= 5000.0 {
        0.25
    } else {
        0.125
    };
    let f2lf = f2 * df.ln() - df * LN_2 - ln_gamma(f2) + ulen.ln();

    let mut total = 0.0;
    for i in 1..=50 {
        let mut interval_sum = 0.0;
        let twa1 = (2 * i - 1) as f64 * ulen;

        for jj in 1..=16 {
            let (j, offset) = if jj > 8 {
                let j = jj - 9;
                (j, XLEGQ[j] * ulen)
            } else {
                let j = jj - 1;
                (j, -XLEGQ[j] * ulen)
            };
            let t = twa1 + offset;
            let log_density = f2lf + f21 * t.ln() - t * ff4;
            if log_density >= -30.0 {
                let scaled = q * (t * 0.5).sqrt();
                interval_sum += wprob(&normal, scaled, groups) * ALEGQ[j] * log_density.exp();
            }
        }

        if i as f64 * ulen >= 1.0 && interval_sum <= 1e-14 {
            break;
        }
        total += interval_sum;
    }

    Ok(total.min(1.0))
}

/// Quantile of the studentized range, found by bisection on [`ptukey`].
pub fn qtukey(p: f64, groups: f64, df: f64) -> Result<f64, StatsError> {
    if !(0.0..1.0).contains(&p) {
        return Err(StatsError::Distribution(format!(
            "probability must be in [0, 1), got {p}"
        )));
    }
    let mut low = 0.0;
    let mut high = 1.0;
    while ptukey(high, groups, df)? < p {
        high *= 2.0;
        if high > 1e6 {
            return Err(StatsError::NonFinite("studentized range quantile"));
        }
    }
    for _ in 0..100 {
        let mid = 0.5 * (low + high);
        if ptukey(mid, groups, df)? < p {
            low = mid;
        } else {
            high = mid;
        }
    }
    Ok(0.5 * (low + high))
}

/// One pairwise row of a Tukey HSD table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TukeyComparison {
    pub group1: String,
    pub group2: String,
    /// Mean of `group2` minus mean of `group1`.
    pub mean_diff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// Tukey honestly-significant-difference comparison of every pair of groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TukeyHsd {
    pub alpha: f64,
    pub comparisons: Vec<TukeyComparison>,
}

/// Run Tukey HSD (Tukey-Kramer for unequal sizes) over `groups`.
///
/// Uses the pooled residual variance with `N - k` degrees of freedom, which
/// must be at least 2.
pub fn tukey_hsd(groups: &[Group], alpha: f64) -> Result<TukeyHsd, StatsError> {
    let k = groups.len();
    if k < 2 {
        return Err(StatsError::TooFewGroups {
            required: 2,
            found: k,
        });
    }
    let n: usize = groups.iter().map(Group::len).sum();
    if n < k + 2 || groups.iter().any(Group::is_empty) {
        return Err(StatsError::TooFewObservations {
            required: k + 2,
            found: n,
        });
    }
    for group in groups {
        check_finite(&group.values, "Tukey HSD input")?;
    }

    let df = (n - k) as f64;
    let means: Vec<f64> = groups.iter().map(Group::mean).collect();
    let mse = groups
        .iter()
        .zip(&means)
        .map(|(g, &m)| sum_sq_dev(&g.values, m))
        .sum::<f64>()
        / df;
    let k = k as f64;
    let q_crit = qtukey(1.0 - alpha, k, df)?;

    let mut comparisons = Vec::new();
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let mean_diff = means[j] - means[i];
            let se = (mse / 2.0 * (1.0 / groups[i].len() as f64 + 1.0 / groups[j].len() as f64))
                .sqrt();
            let p_adj = if se == 0.0 {
                if mean_diff == 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                1.0 - ptukey(mean_diff.abs() / se, k, df)?
            };
            comparisons.push(TukeyComparison {
                group1: groups[i].label.clone(),
                group2: groups[j].label.clone(),
                mean_diff,
                p_adj,
                lower: mean_diff - q_crit * se,
                upper: mean_diff + q_crit * se,
                reject: p_adj < alpha,
            });
        }
    }

    Ok(TukeyHsd { alpha, comparisons })
}

impl fmt::Display for TukeyHsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers = ["group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"];
        let rows: Vec<[String; 7]> = self
            .comparisons
            .iter()
            .map(|c| {
                [
                    c.group1.clone(),
                    c.group2.clone(),
                    format!("{:.4}", c.mean_diff),
                    format!("{:.4}", c.p_adj),
                    format!("{:.4}", c.lower),
                    format!("{:.4}", c.upper),
                    if c.reject { "True" } else { "False" }.to_string(),
                ]
            })
            .collect();

        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        let line_len = widths.iter().sum::<usize>() + widths.len() - 1;

        writeln!(
            f,
            "Multiple Comparison of Means - Tukey HSD, FWER={:.2}",
            self.alpha
        )?;
        writeln!(f, "{}", "=".repeat(line_len))?;
        let header: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:>w$}", h, w = *w))
            .collect();
        writeln!(f, "{}", header.join(" "))?;
        writeln!(f, "{}", "-".repeat(line_len))?;
        for row in &rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:>w$}", c, w = *w))
                .collect();
            writeln!(f, "{}", cells.join(" "))?;
        }
        write!(f, "{}", "-".repeat(line_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(label: &str, values: &[f64]) -> Group {
        Group::new(label, values.to_vec())
    }

    #[test]
    fn test_qtukey_reference_values() {
        // Reference: qtukey(0.95, 3, 12) = 3.772929
        let q = qtukey(0.95, 3.0, 12.0).unwrap();
        assert!((q - 3.772929).abs() < 1e-4);
    }

    #[test]
    fn test_qtukey_large_df() {
        // Wider integration steps above 100 df. Reference: qtukey(0.95, 3, 120) = 3.356
        let q = qtukey(0.95, 3.0, 120.0).unwrap();
        assert!((q - 3.3561).abs() < 1e-3);

        let p = ptukey(3.5, 3.0, 200.0).unwrap();
        assert!((p - 0.96248).abs() < 1e-4);

        let q = qtukey(0.95, 4.0, 1000.0).unwrap();
        assert!((q - 3.6393).abs() < 1e-3);
    }

    #[test]
    fn test_two_groups_match_t_distribution() {
        // With two means q = sqrt(2) * t, so qtukey(0.95, 2, 6) = sqrt(2) * 2.446912
        let q = qtukey(0.95, 2.0, 6.0).unwrap();
        assert!((q - 3.460456).abs() < 1e-4);
    }

    #[test]
    fn test_ptukey_bounds() {
        assert_eq!(ptukey(0.0, 3.0, 10.0).unwrap(), 0.0);
        assert_eq!(ptukey(f64::INFINITY, 3.0, 10.0).unwrap(), 1.0);
        let p = ptukey(3.0, 4.0, 20.0).unwrap();
        assert!(p > 0.0 && p < 1.0);
        assert!(ptukey(3.0, 4.0, 1.0).is_err());
    }

    #[test]
    fn test_ptukey_is_monotonic() {
        let low = ptukey(2.0, 3.0, 15.0).unwrap();
        let high = ptukey(4.0, 3.0, 15.0).unwrap();
        assert!(low < high);
    }

    #[test]
    fn test_tukey_two_groups() {
        let groups = [
            group("A", &[10.0, 11.0, 12.0, 13.0]),
            group("B", &[50.0, 51.0, 52.0, 53.0]),
        ];
        let result = tukey_hsd(&groups, 0.05).unwrap();

        assert_eq!(result.comparisons.len(), 1);
        let pair = &result.comparisons[0];
        assert_eq!(pair.group1, "A");
        assert_eq!(pair.group2, "B");
        assert!((pair.mean_diff - 40.0).abs() < 1e-12);
        assert!(pair.p_adj < 1e-6);
        assert!((pair.lower - 37.7663).abs() < 1e-3);
        assert!((pair.upper - 42.2337).abs() < 1e-3);
        assert!(pair.reject);
    }

    #[test]
    fn test_tukey_three_groups_pair_count() {
        let groups = [
            group("A", &[4.1, 5.2, 6.3, 5.0]),
            group("B", &[6.0, 7.1, 5.9, 6.8]),
            group("C", &[5.5, 5.0, 6.1, 5.7]),
        ];
        let result = tukey_hsd(&groups, 0.05).unwrap();
        let pairs: Vec<(&str, &str)> = result
            .comparisons
            .iter()
            .map(|c| (c.group1.as_str(), c.group2.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "C")]);
        assert!(result.comparisons.iter().all(|c| c.lower < c.upper));
    }

    #[test]
    fn test_tukey_needs_residual_df() {
        let groups = [group("A", &[1.0, 2.0]), group("B", &[3.0])];
        assert!(tukey_hsd(&groups, 0.05).unwrap_err().is_insufficient());
    }

    #[test]
    fn test_tukey_table_rendering() {
        let groups = [
            group("A", &[10.0, 11.0, 12.0, 13.0]),
            group("B", &[50.0, 51.0, 52.0, 53.0]),
        ];
        let text = tukey_hsd(&groups, 0.05).unwrap().to_string();

        assert!(text.starts_with("Multiple Comparison of Means - Tukey HSD, FWER=0.05"));
        assert!(text.contains("group1 group2"));
        assert!(text.contains("40.0000"));
        assert!(text.contains("True"));
    }
}
