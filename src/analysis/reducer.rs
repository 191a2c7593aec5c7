//! Per-member reduction.
//!
//! Maps one member detail record to the fixed set of counters that the
//! aggregator folds. Pure and deterministic.

use crate::models::{MemberCounters, MemberDetail};

pub const EXECUTOR: &str = "CAPITALEXECUTOR";
pub const PROFUNDITY: &str = "CAPITALPROFUNDITY";
pub const LEVIATHAN: &str = "CAPITALLEVIATHAN";

const FDC15_TIER: u32 = 15;
const FDC12_TIER: u32 = 12;
const DC9_TIER: u32 = 9;

/// Reduce a member detail record to its counters.
pub fn reduce(detail: &MemberDetail) -> MemberCounters {
    let mut counters = MemberCounters {
        success: true,
        arena_rank: detail.arena_rank,
        fleet_rank: detail.fleet_rank,
        ..MemberCounters::default()
    };

    for unit in &detail.units {
        if unit.top_tier {
            counters.top_tier_units += 1;
        }
        match unit.base_id.as_str() {
            EXECUTOR => counters.has_executor = true,
            PROFUNDITY => counters.has_profundity = true,
            LEVIATHAN => counters.has_leviathan = true,
            _ => {}
        }
    }

    // Buckets overlap: a tier 15 focused datacron lands in all three.
    for decoration in &detail.decorations {
        let Some(tier) = decoration.tier else {
            continue;
        };
        let focused = decoration.is_focused();

        if tier >= FDC15_TIER && focused {
            counters.fdc15 += 1;
        }
        if tier >= FDC12_TIER && focused {
            counters.fdc12 += 1;
        }
        if tier >= DC9_TIER {
            counters.dc9 += 1;
        }
    }

    counters
}
