//! Per-column test selection and execution.
//!
//! [`analyze`] is pure: it reads the dataset and configuration and returns
//! one [`ColumnReport`] per numeric column, in column order.

use farm_hypothesis_core::stats::{
    dunn_bonferroni, kruskal_wallis, levene, one_way_anova, shapiro_wilk, tukey_hsd,
    welch_anova_hc3, StatsError,
};
use farm_hypothesis_core::{
    ColumnReport, Dataset, Group, GroupComparison, PostHoc, TestDecision, TestOutcome,
};
use tracing::{debug, warn};

use crate::config::{AnalysisConfig, ColumnsConfig, NormalityBasis};

/// Analyze every numeric column not excluded by `columns`.
pub fn analyze(
    dataset: &Dataset,
    columns: &ColumnsConfig,
    settings: &AnalysisConfig,
) -> Vec<ColumnReport> {
    dataset
        .numeric_columns(&columns.exclude)
        .iter()
        .map(|column| analyze_column(dataset, column, &columns.group, settings))
        .collect()
}

fn analyze_column(
    dataset: &Dataset,
    column: &str,
    group_fields: &[String],
    settings: &AnalysisConfig,
) -> ColumnReport {
    let values = dataset.non_missing(column);
    let n = values.len();
    let na_ratio = dataset.missing_ratio(column);

    if n < settings.min_sample || na_ratio > settings.max_na_ratio {
        debug!(
            column,
            n,
            na_ratio,
            "Skipping column with insufficient data"
        );
        return ColumnReport::Skipped {
            column: column.to_string(),
            n,
            na_ratio,
        };
    }

    let normality_p = normality(&values, column);
    let comparisons = group_fields
        .iter()
        .map(|group_by| compare(dataset, column, group_by, normality_p, settings))
        .collect();

    ColumnReport::Analyzed {
        column: column.to_string(),
        n,
        na_ratio,
        normality_p,
        comparisons,
    }
}

/// Shapiro-Wilk p-value, or `None` when the test cannot run.
fn normality(sample: &[f64], context: &str) -> Option<f64> {
    match shapiro_wilk(sample) {
        Ok(result) => Some(result.p_value),
        Err(e) => {
            debug!(context, error = %e, "Normality undefined");
            None
        }
    }
}

/// Deviations of each value from its group mean.
fn residuals(groups: &[Group]) -> Vec<f64> {
    groups
        .iter()
        .flat_map(|group| {
            let mean = group.mean();
            group.values.iter().map(move |v| v - mean)
        })
        .collect()
}

fn compare(
    dataset: &Dataset,
    column: &str,
    group_by: &str,
    normality_p: Option<f64>,
    settings: &AnalysisConfig,
) -> GroupComparison {
    let groups = dataset.groups(column, group_by);
    let sized: Vec<Group> = groups
        .iter()
        .filter(|g| g.len() >= settings.min_sample)
        .cloned()
        .collect();

    let variance_p = if sized.len() < 2 {
        None
    } else {
        match levene(&sized) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!(column, group_by, error = %e, "Variance homogeneity undefined");
                None
            }
        }
    };

    let residual_normality_p = match settings.normality_basis {
        NormalityBasis::Column => None,
        NormalityBasis::Residuals => normality(&residuals(&groups), column),
    };
    let decision_normality = match settings.normality_basis {
        NormalityBasis::Column => normality_p,
        NormalityBasis::Residuals => residual_normality_p,
    };

    let decision = TestDecision::recommend(decision_normality, variance_p, settings.alpha);
    debug!(
        column,
        group_by,
        normality_p = ?decision_normality,
        variance_p = ?variance_p,
        %decision,
        "Selected test"
    );

    let outcome = match decision {
        TestDecision::Skip => TestOutcome::NotEnoughData,
        TestDecision::Anova => TestOutcome::from(one_way_anova(&groups).map(|t| t.p_value)),
        TestDecision::Welch => TestOutcome::from(welch_anova_hc3(&groups).map(|t| t.p_value)),
        TestDecision::Kruskal => TestOutcome::from(kruskal_wallis(&sized)),
    };
    if let TestOutcome::Failed { error } = &outcome {
        warn!(column, group_by, %decision, error = %error, "Test failed");
    }

    let post_hoc = outcome
        .is_significant(settings.alpha)
        .then(|| post_hoc(decision, &groups, settings.alpha));

    GroupComparison {
        column: column.to_string(),
        group_by: group_by.to_string(),
        decision,
        residual_normality_p,
        variance_p,
        outcome,
        post_hoc,
    }
}

/// Pairwise follow-up on the complete rows of a significant comparison.
///
/// Parametric decisions use Tukey HSD, the rank-based one uses Dunn with a
/// Bonferroni adjustment.
fn post_hoc(decision: TestDecision, groups: &[Group], alpha: f64) -> PostHoc {
    if groups.len() < 2 {
        return PostHoc::NotEnoughGroups;
    }

    let result = match decision {
        TestDecision::Anova | TestDecision::Welch => tukey_hsd(groups, alpha).map(PostHoc::Tukey),
        TestDecision::Kruskal => dunn_bonferroni(groups).map(PostHoc::Dunn),
        TestDecision::Skip => return PostHoc::NotEnoughGroups,
    };

    result.unwrap_or_else(|e: StatsError| {
        warn!(error = %e, "Post-hoc failed");
        PostHoc::Failed {
            error: e.to_string(),
        }
    })
}
