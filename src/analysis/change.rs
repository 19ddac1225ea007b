use tracing::debug;

use crate::config::NANOS_PER_MINUTE;
use crate::db::PriceReader;
use crate::error::Result;
use crate::types::PriceChange;

/// Absolute and percent change from `old_price` to `new_price`.
/// Percent is 0 when `old_price <= 0`.
pub fn price_delta(old_price: f64, new_price: f64) -> (f64, f64) {
    let change_absolute = new_price - old_price;
    let change_percent = if old_price > 0.0 {
        change_absolute / old_price * 100.0
    } else {
        0.0
    };
    (change_absolute, change_percent)
}

/// Change of one token over the trailing `window_minutes`, anchored at its newest sample.
///
/// Returns `Ok(None)` when the token has no samples, has nothing at or before
/// `newest - window`, or cannot be resolved to a market and outcome.
pub async fn calculate_price_change<S>(
    store: &S,
    token_id: &str,
    window_minutes: u32,
) -> Result<Option<PriceChange>>
where
    S: PriceReader + ?Sized,
{
    let Some(new) = store.latest_price(token_id).await? else {
        return Ok(None);
    };

    let cutoff_ns = new
        .timestamp_ns
        .saturating_sub(i64::from(window_minutes).saturating_mul(NANOS_PER_MINUTE));
    let Some(old) = store.latest_price_at_or_before(token_id, cutoff_ns).await? else {
        return Ok(None);
    };

    let (change_absolute, change_percent) = price_delta(old.price, new.price);

    let Some(info) = store.token_info(token_id).await? else {
        return Ok(None);
    };

    Ok(Some(PriceChange {
        condition_id: info.condition_id,
        question: info.question,
        token_id: token_id.to_string(),
        outcome: info.outcome,
        old_price: old.price,
        new_price: new.price,
        change_percent,
        change_absolute,
        window_minutes,
        old_timestamp_ns: old.timestamp_ns,
        new_timestamp_ns: new.timestamp_ns,
    }))
}

/// Every computable change across tokens of active, non-closed markets.
/// Tokens without enough history are skipped silently.
pub async fn tradeable_changes<S>(store: &S, window_minutes: u32) -> Result<Vec<PriceChange>>
where
    S: PriceReader + ?Sized,
{
    let token_ids = store.tradeable_token_ids().await?;
    let mut changes = Vec::with_capacity(token_ids.len());

    for token_id in &token_ids {
        if let Some(change) = calculate_price_change(store, token_id, window_minutes).await? {
            changes.push(change);
        }
    }

    debug!(
        tokens = token_ids.len(),
        changes = changes.len(),
        window_minutes,
        "Computed tradeable changes"
    );
    Ok(changes)
}
