use crate::types::PriceChange;

/// Keep changes with `|change %| >= threshold_percent`, largest magnitude first.
pub fn rank_significant(
    changes: Vec<PriceChange>,
    threshold_percent: f64,
    limit: usize,
) -> Vec<PriceChange> {
    let mut significant: Vec<PriceChange> = changes
        .into_iter()
        .filter(|c| c.change_percent.abs() >= threshold_percent)
        .collect();

    significant.sort_by(|a, b| b.change_percent.abs().total_cmp(&a.change_percent.abs()));
    significant.truncate(limit);
    significant
}
