//! Data models for guild comparison.
//!
//! This module contains the records that flow through the comparison
//! pipeline: roster rows from the provider, per-member detail records,
//! the counters derived from each member, and the per-guild aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Competitive league a member is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum League {
    Carbonite,
    Bronzium,
    Chromium,
    Aurodium,
    Kyber,
}

impl League {
    /// All recognised leagues, highest first.
    pub const ALL: [League; 5] = [
        League::Kyber,
        League::Aurodium,
        League::Chromium,
        League::Bronzium,
        League::Carbonite,
    ];

    /// Parse a provider league label. Unrecognised labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "KYBER" => Some(League::Kyber),
            "AURODIUM" => Some(League::Aurodium),
            "CHROMIUM" => Some(League::Chromium),
            "BRONZIUM" => Some(League::Bronzium),
            "CARBONITE" => Some(League::Carbonite),
            _ => None,
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            League::Kyber => write!(f, "Kyber"),
            League::Aurodium => write!(f, "Aurodium"),
            League::Chromium => write!(f, "Chromium"),
            League::Bronzium => write!(f, "Bronzium"),
            League::Carbonite => write!(f, "Carbonite"),
        }
    }
}

/// One row of a guild roster.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    /// Provider key used to fetch the member detail record.
    pub member_id: String,
    /// Display name of the member.
    pub name: String,
    /// Current galactic power.
    pub power: u64,
    /// League label as reported by the provider.
    pub league: Option<String>,
}

/// A guild roster as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    /// Guild display name.
    pub name: String,
    /// One entry per member.
    pub members: Vec<RosterEntry>,
}

/// A unit owned by a member.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedUnit {
    pub base_id: String,
    /// Whether the unit is a galactic legend.
    pub top_tier: bool,
}

/// A datacron owned by a member.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    /// Tier reached, if the provider reported one.
    pub tier: Option<u32>,
    /// Template id; focused datacrons carry a `focused` marker.
    pub template_id: String,
}

impl Decoration {
    /// Returns true if the template id marks a focused datacron.
    pub fn is_focused(&self) -> bool {
        self.template_id.to_lowercase().contains(FOCUSED_MARKER)
    }
}

const FOCUSED_MARKER: &str = "focused";

/// Detailed record for a single member.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberDetail {
    pub units: Vec<OwnedUnit>,
    pub decorations: Vec<Decoration>,
    pub arena_rank: Option<u32>,
    pub fleet_rank: Option<u32>,
}

/// Counters derived from one member's detail record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberCounters {
    /// Number of galactic legends owned.
    pub top_tier_units: u32,
    pub has_executor: bool,
    pub has_profundity: bool,
    pub has_leviathan: bool,
    /// Focused datacrons at tier 15 or above.
    pub fdc15: u32,
    /// Focused datacrons at tier 12 or above.
    pub fdc12: u32,
    /// Datacrons at tier 9 or above.
    pub dc9: u32,
    pub arena_rank: Option<u32>,
    pub fleet_rank: Option<u32>,
    /// False when the detail record could not be retrieved.
    pub success: bool,
}

impl MemberCounters {
    /// Counters for a member whose detail fetch failed.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Member counts per league.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueCounts {
    pub kyber: usize,
    pub aurodium: usize,
    pub chromium: usize,
    pub bronzium: usize,
    pub carbonite: usize,
}

impl LeagueCounts {
    /// Count one member in the given league.
    pub fn record(&mut self, league: League) {
        match league {
            League::Kyber => self.kyber += 1,
            League::Aurodium => self.aurodium += 1,
            League::Chromium => self.chromium += 1,
            League::Bronzium => self.bronzium += 1,
            League::Carbonite => self.carbonite += 1,
        }
    }

    pub fn get(&self, league: League) -> usize {
        match league {
            League::Kyber => self.kyber,
            League::Aurodium => self.aurodium,
            League::Chromium => self.chromium,
            League::Bronzium => self.bronzium,
            League::Carbonite => self.carbonite,
        }
    }

    /// Number of members placed in a recognised league.
    pub fn total(&self) -> usize {
        League::ALL.iter().map(|l| self.get(*l)).sum()
    }
}

/// Fully reduced statistics for one guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Identifier the aggregation was requested for.
    pub guild_id: String,
    /// Guild display name.
    pub name: String,
    pub total_power: u64,
    pub member_count: usize,
    /// Floor of total power over member count; zero for an empty guild.
    pub average_power: u64,
    pub leagues: LeagueCounts,
    /// Members with at least 10M power.
    pub members_10m_plus: usize,
    /// Members with power in [8M, 10M).
    pub members_8m_to_10m: usize,
    pub top_tier_units: u32,
    /// Galactic legends per member.
    pub average_top_tier_units: f64,
    pub executor_owners: u32,
    pub profundity_owners: u32,
    pub leviathan_owners: u32,
    pub fdc15: u32,
    pub fdc12: u32,
    pub dc9: u32,
    /// Average over members with a known arena rank.
    pub average_arena_rank: Option<f64>,
    /// Average over members with a known fleet arena rank.
    pub average_fleet_rank: Option<f64>,
    pub success_count: usize,
    pub failure_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl AggregateRecord {
    /// Returns true if some member detail records were not retrieved.
    pub fn is_partial(&self) -> bool {
        self.failure_count > 0
    }
}
