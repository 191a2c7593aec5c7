//! Analysis modules.
//!
//! Member reduction, guild aggregation and the two-guild comparison.

pub mod aggregator;
pub mod comparison;
pub mod reducer;

pub use aggregator::{GuildAggregator, DEFAULT_CONCURRENCY};
pub use comparison::{compare_guilds, ComparisonOutcome};
