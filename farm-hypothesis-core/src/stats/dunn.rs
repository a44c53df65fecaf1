use std::fmt;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use super::{check_finite, rank_with_ties, StatsError};
use crate::dataset::Group;

/// Symmetric matrix of Bonferroni-adjusted Dunn p-values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DunnMatrix {
    pub labels: Vec<String>,
    /// Row-major `labels.len()` squared entries; the diagonal is 1.
    pub p_values: Vec<Vec<f64>>,
}

impl DunnMatrix {
    /// Adjusted p-value for a pair of labels.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.p_values[i][j])
    }
}

/// Dunn's pairwise rank test with tie correction and Bonferroni adjustment.
///
/// Ranks are taken over all groups together. Each pair is compared with a
/// two-sided normal test on the difference of mean ranks, and the p-value
/// is multiplied by the number of pairs (capped at 1).
pub fn dunn_bonferroni(groups: &[Group]) -> Result<DunnMatrix, StatsError> {
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
    check_finite(&all, "Dunn input")?;
    let n = all.len() as f64;
    let (ranks, ties) = rank_with_ties(&all);

    let mut mean_ranks = Vec::with_capacity(k);
    let mut offset = 0;
    for group in groups {
        let slice = &ranks[offset..offset + group.len()];
        mean_ranks.push(slice.iter().sum::<f64>() / group.len() as f64);
        offset += group.len();
    }

    let normal = Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))?;
    let pairs = (k * (k - 1) / 2) as f64;
    let spread = n * (n + 1.0) / 12.0 - ties / (12.0 * (n - 1.0));

    let mut p_values = vec![vec![1.0; k]; k];
    for i in 0..k {
        for j in (i + 1)..k {
            let diff = (mean_ranks[i] - mean_ranks[j]).abs();
            let se =
                (spread * (1.0 / groups[i].len() as f64 + 1.0 / groups[j].len() as f64)).sqrt();
            let p = if se > 0.0 && se.is_finite() {
                2.0 * normal.sf(diff / se)
            } else if diff == 0.0 {
                1.0
            } else {
                return Err(StatsError::NonFinite("Dunn standard error"));
            };
            let adjusted = (p * pairs).min(1.0);
            p_values[i][j] = adjusted;
            p_values[j][i] = adjusted;
        }
    }

    Ok(DunnMatrix {
        labels: groups.iter().map(|g| g.label.clone()).collect(),
        p_values,
    })
}

impl fmt::Display for DunnMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .p_values
            .iter()
            .map(|row| row.iter().map(|p| format!("{:.6}", p)).collect())
            .collect();

        let label_width = self.labels.iter().map(String::len).max().unwrap_or(0);
        let column_widths: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .map(|(j, label)| {
                cells
                    .iter()
                    .map(|row| row[j].len())
                    .chain(std::iter::once(label.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut header = " ".repeat(label_width);
        for (label, width) in self.labels.iter().zip(&column_widths) {
            header.push_str(&format!("  {:>w$}", label, w = *width));
        }
        write!(f, "{}", header)?;

        for (label, row) in self.labels.iter().zip(&cells) {
            writeln!(f)?;
            write!(f, "{:<w$}", label, w = label_width)?;
            for (cell, width) in row.iter().zip(&column_widths) {
                write!(f, "  {:>w$}", cell, w = *width)?;
            }
        }
        Ok(())
    }
}
