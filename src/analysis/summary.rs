use crate::analysis::change::calculate_price_change;
use crate::db::PriceReader;
use crate::error::Result;
use crate::types::{MarketSummary, TokenSummary};

/// Market metadata plus each token's latest price and its change over `window_minutes`.
/// `Ok(None)` if the condition id is unknown.
pub async fn market_summary<S>(
    store: &S,
    condition_id: &str,
    window_minutes: u32,
) -> Result<Option<MarketSummary>>
where
    S: PriceReader + ?Sized,
{
    let Some(market) = store.market(condition_id).await? else {
        return Ok(None);
    };

    let latest = store.latest_prices_for_market(condition_id).await?;
    let mut tokens = Vec::with_capacity(latest.len());

    for (token, observation) in latest {
        let change = calculate_price_change(store, &token.token_id, window_minutes).await?;
        tokens.push(TokenSummary {
            token_id: token.token_id,
            outcome: token.outcome,
            current_price: observation.as_ref().map(|o| o.price),
            timestamp_ns: observation.as_ref().map(|o| o.timestamp_ns),
            change,
        });
    }

    Ok(Some(MarketSummary { market, tokens }))
}
