use std::collections::HashMap;

use crate::types::{PriceChange, TrendingMarket};

/// Roll per-token changes up to their market and rank by total volatility.
///
/// The question shown for a market is the one carried by the first change
/// seen for it.
pub fn aggregate_trending(changes: &[PriceChange], limit: usize) -> Vec<TrendingMarket> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut markets: Vec<TrendingMarket> = Vec::new();

    for change in changes {
        let magnitude = change.change_percent.abs();
        let slot = *index.entry(change.condition_id.as_str()).or_insert_with(|| {
            markets.push(TrendingMarket {
                condition_id: change.condition_id.clone(),
                question: change.question.clone(),
                max_change: 0.0,
                total_volatility: 0.0,
                num_changes: 0,
            });
            markets.len() - 1
        });

        let entry = &mut markets[slot];
        entry.max_change = entry.max_change.max(magnitude);
        entry.total_volatility += magnitude;
        entry.num_changes += 1;
    }

    markets.sort_by(|a, b| b.total_volatility.total_cmp(&a.total_volatility));
    markets.truncate(limit);
    markets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(cid: &str, token: &str, pct: f64) -> PriceChange {
        PriceChange {
            condition_id: cid.to_string(),
            question: format!("Question {cid}"),
            token_id: token.to_string(),
            outcome: "Yes".to_string(),
            old_price: 0.5,
            new_price: 0.5,
            change_percent: pct,
            change_absolute: 0.0,
            window_minutes: 60,
            old_timestamp_ns: 0,
            new_timestamp_ns: 1,
        }
    }

    #[test]
    fn groups_tokens_of_same_market() {
        let changes = vec![change("M", "A", 3.0), change("M", "B", -7.0)];
        let out = aggregate_trending(&changes, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].condition_id, "M");
        assert!((out[0].max_change - 7.0).abs() < 1e-9);
        assert!((out[0].total_volatility - 10.0).abs() < 1e-9);
        assert_eq!(out[0].num_changes, 2);
    }

    #[test]
    fn ranks_by_total_not_max() {
        let changes = vec![
            change("spiky", "s1", 9.0),
            change("busy", "b1", 5.0),
            change("busy", "b2", 5.0),
        ];
        let out = aggregate_trending(&changes, 10);
        let ids: Vec<&str> = out.iter().map(|m| m.condition_id.as_str()).collect();
        assert_eq!(ids, vec!["busy", "spiky"]);
    }

    #[test]
    fn truncates_to_limit() {
        let changes: Vec<PriceChange> = (0..5)
            .map(|i| change(&format!("m{i}"), "t", i as f64 + 1.0))
            .collect();
        let out = aggregate_trending(&changes, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].condition_id, "m4");
    }
}
