use crate::types::{Direction, PriceChange};

/// Order changes by direction:
/// `Up` keeps gains (largest first), `Down` keeps losses (most negative first),
/// `Both` keeps everything by magnitude.
pub fn rank_movers(changes: Vec<PriceChange>, direction: Direction, limit: usize) -> Vec<PriceChange> {
    let mut movers = changes;

    match direction {
        Direction::Up => {
            movers.retain(|c| c.change_percent > 0.0);
            movers.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
        }
        Direction::Down => {
            movers.retain(|c| c.change_percent < 0.0);
            movers.sort_by(|a, b| a.change_percent.total_cmp(&b.change_percent));
        }
        Direction::Both => {
            movers.sort_by(|a, b| b.change_percent.abs().total_cmp(&a.change_percent.abs()));
        }
    }

    movers.truncate(limit);
    movers
}
