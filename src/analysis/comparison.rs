//! Two-guild comparison.

use crate::analysis::aggregator::{AggregationError, GuildAggregator};
use crate::models::AggregateRecord;
use tracing::warn;

/// Result of aggregating both sides of a comparison.
#[derive(Debug)]
pub enum ComparisonOutcome {
    Ready {
        own: AggregateRecord,
        opponent: AggregateRecord,
    },
    /// At least one side failed; one reason per failed guild.
    Failed(Vec<String>),
}

/// Aggregate both guilds concurrently.
pub async fn compare_guilds(
    aggregator: &GuildAggregator,
    own_guild: &str,
    opponent_guild: &str,
) -> ComparisonOutcome {
    let (own, opponent) = tokio::join!(
        aggregator.aggregate(own_guild),
        aggregator.aggregate(opponent_guild)
    );

    match (own, opponent) {
        (Ok(own), Ok(opponent)) => ComparisonOutcome::Ready { own, opponent },
        (own, opponent) => {
            let mut reasons = Vec::new();
            if let Err(e) = own {
                reasons.push(failure_reason("own guild", own_guild, &e));
            }
            if let Err(e) = opponent {
                reasons.push(failure_reason("opponent guild", opponent_guild, &e));
            }
            ComparisonOutcome::Failed(reasons)
        }
    }
}

fn failure_reason(side: &str, guild_id: &str, error: &AggregationError) -> String {
    warn!("Comparison failed for {} {}: {}", side, guild_id, error);
    format!("{} `{}`: {}", side, guild_id, error)
}
