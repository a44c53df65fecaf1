use std::f64::consts::{FRAC_1_SQRT_2, PI};

use statrs::distribution::{ContinuousCDF, Normal};

use super::{check_finite, StatsError};

// Royston (1995), algorithm AS R94: polynomial approximations for the
// extreme coefficients and for the null distribution of W.
const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

const SMALL_RANGE: f64 = 1e-19;

/// Result of a Shapiro-Wilk normality test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

/// Shapiro-Wilk test that `sample` comes from a normal distribution.
///
/// Needs at least three observations. A sample with zero range gives
/// `W = 1, p = 1`.
pub fn shapiro_wilk(sample: &[f64]) -> Result<ShapiroWilk, StatsError> {
    let n = sample.len();
    if n < 3 {
        return Err(StatsError::TooFewObservations {
            required: 3,
            found: n,
        });
    }
    check_finite(sample, "normality sample")?;

    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);
    let range = x[n - 1] - x[0];
    if range < SMALL_RANGE {
        return Ok(ShapiroWilk {
            w: 1.0,
            p_value: 1.0,
        });
    }

    let a = coefficients(n)?;

    // W as the squared correlation between the ordered sample and the
    // coefficients; the coefficients already sum to zero.
    let scaled: Vec<f64> = x.iter().map(|v| v / range).collect();
    let mean = scaled.iter().sum::<f64>() / n as f64;
    let mut ssa = 0.0;
    let mut ssx = 0.0;
    let mut sax = 0.0;
    for (ai, xi) in a.iter().zip(&scaled) {
        let dx = xi - mean;
        ssa += ai * ai;
        ssx += dx * dx;
        sax += ai * dx;
    }
    let ssassx = (ssa * ssx).sqrt();
    let w1 = (ssassx - sax.abs()) * (ssassx + sax.abs()) / (ssa * ssx);
    let w = 1.0 - w1;

    Ok(ShapiroWilk {
        w,
        p_value: p_value(w, w1, n)?,
    })
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal() -> Result<Normal, StatsError> {
    Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))
}

/// Antisymmetric coefficient vector for the ordered sample.
fn coefficients(n: usize) -> Result<Vec<f64>, StatsError> {
    let mut a = vec![0.0; n];
    if n == 3 {
        a[0] = -FRAC_1_SQRT_2;
        a[2] = FRAC_1_SQRT_2;
        return Ok(a);
    }

    let half = n / 2;
    let an = n as f64;
    let normal = standard_normal()?;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
        .collect();

    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;

    let mut upper = vec![0.0; half];
    let (first_scaled, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        upper[1] = a2;
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };
    upper[0] = a1;
    for i in first_scaled..half {
        upper[i] = -m[i] / fac;
    }
    if !fac.is_finite() || upper.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite("Shapiro-Wilk coefficients"));
    }

    for (i, coefficient) in upper.into_iter().enumerate() {
        a[i] = -coefficient;
        a[n - 1 - i] = coefficient;
    }
    Ok(a)
}

fn p_value(w: f64, w1: f64, n: usize) -> Result<f64, StatsError> {
    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - PI / 3.0);
        return Ok(p.clamp(0.0, 1.0));
    }
    if w1 <= 0.0 {
        return Ok(1.0);
    }

    let an = n as f64;
    let y = w1.ln();
    let (y, mean, sd) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return Ok(1e-99);
        }
        (-(gamma - y).ln(), poly(&C3, an), poly(&C4, an).exp())
    } else {
        let log_n = an.ln();
        (y, poly(&C5, log_n), poly(&C6, log_n).exp())
    };

    let null = Normal::new(mean, sd).map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(null.sf(y))
}
