//! Guild aggregation engine.
//!
//! Fetches a guild roster, fans out member detail fetches under a
//! concurrency cap, and folds the per-member counters into one
//! [`AggregateRecord`]. Only a roster failure aborts an aggregation;
//! failed member fetches are counted and left out of the totals.

use crate::analysis::reducer::reduce;
use crate::models::{AggregateRecord, League, LeagueCounts, MemberCounters, Roster, RosterEntry};
use crate::provider::{Fetch, GuildDataSource};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Default number of member detail fetches in flight per guild.
pub const DEFAULT_CONCURRENCY: usize = 20;

const BRACKET_TOP: u64 = 10_000_000;
const BRACKET_UPPER_MID: u64 = 8_000_000;

/// Fatal aggregation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("guild id must not be empty")]
    EmptyGuildId,

    #[error("roster unavailable")]
    RosterUnavailable { guild_id: String },
}

/// Statistics computed from roster rows alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterStats {
    pub total_power: u64,
    pub member_count: usize,
    pub average_power: u64,
    pub leagues: LeagueCounts,
    pub members_10m_plus: usize,
    pub members_8m_to_10m: usize,
}

/// Compute roster-level statistics.
pub fn roster_stats(members: &[RosterEntry]) -> RosterStats {
    let mut stats = RosterStats {
        member_count: members.len(),
        ..RosterStats::default()
    };

    for member in members {
        stats.total_power += member.power;

        if member.power >= BRACKET_TOP {
            stats.members_10m_plus += 1;
        } else if member.power >= BRACKET_UPPER_MID {
            stats.members_8m_to_10m += 1;
        }

        if let Some(league) = member.league.as_deref().and_then(League::from_label) {
            stats.leagues.record(league);
        }
    }

    if stats.member_count > 0 {
        stats.average_power = stats.total_power / stats.member_count as u64;
    }

    stats
}

/// Running sums over member counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberTotals {
    pub top_tier_units: u32,
    pub executor_owners: u32,
    pub profundity_owners: u32,
    pub leviathan_owners: u32,
    pub fdc15: u32,
    pub fdc12: u32,
    pub dc9: u32,
    pub arena_ranks: Vec<u32>,
    pub fleet_ranks: Vec<u32>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl MemberTotals {
    /// Fold one member's counters in.
    pub fn add(&mut self, counters: &MemberCounters) {
        if !counters.success {
            self.failure_count += 1;
            return;
        }

        self.success_count += 1;
        self.top_tier_units += counters.top_tier_units;
        self.executor_owners += u32::from(counters.has_executor);
        self.profundity_owners += u32::from(counters.has_profundity);
        self.leviathan_owners += u32::from(counters.has_leviathan);
        self.fdc15 += counters.fdc15;
        self.fdc12 += counters.fdc12;
        self.dc9 += counters.dc9;
        self.arena_ranks.extend(counters.arena_rank);
        self.fleet_ranks.extend(counters.fleet_rank);
    }
}

/// Fold a batch of member counters. Order does not matter.
pub fn fold_counters<'a, I>(counters: I) -> MemberTotals
where
    I: IntoIterator<Item = &'a MemberCounters>,
{
    let mut totals = MemberTotals::default();
    for c in counters {
        totals.add(c);
    }
    totals
}

fn average_rank(ranks: &[u32]) -> Option<f64> {
    if ranks.is_empty() {
        return None;
    }
    let sum: u64 = ranks.iter().map(|r| u64::from(*r)).sum();
    Some(sum as f64 / ranks.len() as f64)
}

fn per_member(total: u32, member_count: usize) -> f64 {
    if member_count == 0 {
        0.0
    } else {
        f64::from(total) / member_count as f64
    }
}

/// Combine roster statistics and member totals into a record.
pub fn build_record(
    guild_id: &str,
    name: &str,
    stats: RosterStats,
    totals: MemberTotals,
) -> AggregateRecord {
    AggregateRecord {
        guild_id: guild_id.to_string(),
        name: name.to_string(),
        total_power: stats.total_power,
        member_count: stats.member_count,
        average_power: stats.average_power,
        leagues: stats.leagues,
        members_10m_plus: stats.members_10m_plus,
        members_8m_to_10m: stats.members_8m_to_10m,
        top_tier_units: totals.top_tier_units,
        average_top_tier_units: per_member(totals.top_tier_units, stats.member_count),
        executor_owners: totals.executor_owners,
        profundity_owners: totals.profundity_owners,
        leviathan_owners: totals.leviathan_owners,
        fdc15: totals.fdc15,
        fdc12: totals.fdc12,
        dc9: totals.dc9,
        average_arena_rank: average_rank(&totals.arena_ranks),
        average_fleet_rank: average_rank(&totals.fleet_ranks),
        success_count: totals.success_count,
        failure_count: totals.failure_count,
        generated_at: Utc::now(),
    }
}

/// Aggregates guilds from a data source.
#[derive(Clone)]
pub struct GuildAggregator {
    source: Arc<dyn GuildDataSource>,
    concurrency: usize,
}

impl GuildAggregator {
    /// Create an aggregator. A concurrency of zero is raised to one.
    pub fn new(source: Arc<dyn GuildDataSource>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
        }
    }

    /// Aggregate one guild.
    pub async fn aggregate(&self, guild_id: &str) -> Result<AggregateRecord, AggregationError> {
        let guild_id = guild_id.trim();
        if guild_id.is_empty() {
            return Err(AggregationError::EmptyGuildId);
        }

        info!("Aggregating guild {}", guild_id);

        let roster: Roster = match self.source.fetch_roster(guild_id).await {
            Fetch::Found(roster) => roster,
            Fetch::Absent => {
                warn!("Roster for guild {} not found", guild_id);
                return Err(AggregationError::RosterUnavailable {
                    guild_id: guild_id.to_string(),
                });
            }
            Fetch::Error(e) => {
                warn!("Roster for guild {} unavailable: {}", guild_id, e);
                return Err(AggregationError::RosterUnavailable {
                    guild_id: guild_id.to_string(),
                });
            }
        };

        let stats = roster_stats(&roster.members);
        let counters = self.collect_member_counters(&roster.members).await;
        let totals = fold_counters(&counters);

        info!(
            "Guild {} ({}): {}/{} member records retrieved",
            roster.name, guild_id, totals.success_count, stats.member_count
        );

        Ok(build_record(guild_id, &roster.name, stats, totals))
    }

    /// Fetch and reduce every member with at most `concurrency` in flight.
    async fn collect_member_counters(&self, members: &[RosterEntry]) -> Vec<MemberCounters> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let tasks: Vec<_> = members
            .iter()
            .map(|member| {
                let source = Arc::clone(&self.source);
                let semaphore = Arc::clone(&semaphore);
                let member_id = member.member_id.clone();
                let member_name = member.name.clone();

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return MemberCounters::failed(),
                    };

                    match source.fetch_member_detail(&member_id).await {
                        Fetch::Found(detail) => reduce(&detail),
                        Fetch::Absent => {
                            debug!("Member {} ({}) not found", member_name, member_id);
                            MemberCounters::failed()
                        }
                        Fetch::Error(e) => {
                            debug!("Member {} ({}) unavailable: {}", member_name, member_id, e);
                            MemberCounters::failed()
                        }
                    }
                })
            })
            .collect();

        join_all(tasks)
            .await
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|e| {
                    warn!("Member pipeline aborted: {}", e);
                    MemberCounters::failed()
                })
            })
            .collect()
    }
}
