//! Comparison report generation.
//!
//! Renders two aggregate records into the chat message posted back to
//! the caller, plus a JSON form for the command line.

use crate::analysis::ComparisonOutcome;
use crate::models::{AggregateRecord, League};
use anyhow::Result;

/// Render whatever the comparison produced.
pub fn render_outcome(outcome: &ComparisonOutcome) -> String {
    match outcome {
        ComparisonOutcome::Ready { own, opponent } => render_comparison(own, opponent),
        ComparisonOutcome::Failed(reasons) => render_failure(reasons),
    }
}

/// Generate the side-by-side comparison text.
pub fn render_comparison(own: &AggregateRecord, opponent: &AggregateRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "**Territory War comparison**\n{} vs {}\n",
        display_name(&own.name),
        display_name(&opponent.name)
    ));

    output.push_str("```\n");
    output.push_str(&header_row(own, opponent));
    output.push_str(&generate_power_section(own, opponent));
    output.push_str(&generate_league_section(own, opponent));
    output.push_str(&generate_roster_section(own, opponent));
    output.push_str("```\n");

    output.push_str(&generate_footer(own));
    output.push_str(&generate_footer(opponent));

    output
}

/// Generate the message shown when a comparison could not be produced.
pub fn render_failure(reasons: &[String]) -> String {
    let mut output = String::from("Could not compare guilds.\n");
    for reason in reasons {
        output.push_str(&format!("- {}\n", reason));
    }
    output
}

/// Generate a JSON report of both records.
pub fn generate_json_report(own: &AggregateRecord, opponent: &AggregateRecord) -> Result<String> {
    let value = serde_json::json!({
        "own": own,
        "opponent": opponent,
    });
    serde_json::to_string_pretty(&value).map_err(Into::into)
}

const LABEL_WIDTH: usize = 16;
const VALUE_WIDTH: usize = 14;

fn header_row(own: &AggregateRecord, opponent: &AggregateRecord) -> String {
    row("", &short_name(&own.name), &short_name(&opponent.name))
}

fn row(label: &str, own: &str, opponent: &str) -> String {
    format!(
        "{:<lw$}{:>vw$}{:>vw$}\n",
        label,
        own,
        opponent,
        lw = LABEL_WIDTH,
        vw = VALUE_WIDTH
    )
}

/// Guild names are provider data; backticks would close the code block.
fn display_name(name: &str) -> String {
    name.replace('`', "'")
}

fn short_name(name: &str) -> String {
    let name = display_name(name);
    let limit = VALUE_WIDTH - 1;
    if name.chars().count() <= limit {
        name
    } else {
        name.chars().take(limit - 1).chain(std::iter::once('~')).collect()
    }
}

/// Generate the power section.
fn generate_power_section(own: &AggregateRecord, opponent: &AggregateRecord) -> String {
    let mut section = String::from("-- Power\n");

    section.push_str(&row(
        "Total GP",
        &format_number(own.total_power),
        &format_number(opponent.total_power),
    ));
    section.push_str(&row(
        "Members",
        &own.member_count.to_string(),
        &opponent.member_count.to_string(),
    ));
    section.push_str(&row(
        "Average GP",
        &format_number(own.average_power),
        &format_number(opponent.average_power),
    ));
    section.push_str(&row(
        "10M+",
        &own.members_10m_plus.to_string(),
        &opponent.members_10m_plus.to_string(),
    ));
    section.push_str(&row(
        "8M-10M",
        &own.members_8m_to_10m.to_string(),
        &opponent.members_8m_to_10m.to_string(),
    ));

    section
}

/// Generate the league distribution section.
fn generate_league_section(own: &AggregateRecord, opponent: &AggregateRecord) -> String {
    let mut section = String::from("-- Leagues\n");

    for league in League::ALL {
        section.push_str(&row(
            &league.to_string(),
            &own.leagues.get(league).to_string(),
            &opponent.leagues.get(league).to_string(),
        ));
    }
    section.push_str(&row(
        "Unplaced",
        &own.member_count.saturating_sub(own.leagues.total()).to_string(),
        &opponent.member_count.saturating_sub(opponent.leagues.total()).to_string(),
    ));

    section
}

/// Generate the roster strength section.
fn generate_roster_section(own: &AggregateRecord, opponent: &AggregateRecord) -> String {
    let mut section = String::from("-- Roster\n");

    section.push_str(&row(
        "GLs",
        &own.top_tier_units.to_string(),
        &opponent.top_tier_units.to_string(),
    ));
    section.push_str(&row(
        "GLs / member",
        &format!("{:.2}", own.average_top_tier_units),
        &format!("{:.2}", opponent.average_top_tier_units),
    ));
    section.push_str(&row(
        "Executor",
        &own.executor_owners.to_string(),
        &opponent.executor_owners.to_string(),
    ));
    section.push_str(&row(
        "Profundity",
        &own.profundity_owners.to_string(),
        &opponent.profundity_owners.to_string(),
    ));
    section.push_str(&row(
        "Leviathan",
        &own.leviathan_owners.to_string(),
        &opponent.leviathan_owners.to_string(),
    ));
    section.push_str(&row(
        "FDC15",
        &own.fdc15.to_string(),
        &opponent.fdc15.to_string(),
    ));
    section.push_str(&row(
        "FDC12",
        &own.fdc12.to_string(),
        &opponent.fdc12.to_string(),
    ));
    section.push_str(&row("DC9", &own.dc9.to_string(), &opponent.dc9.to_string()));
    section.push_str(&row(
        "Avg arena rank",
        &format_rank(own.average_arena_rank),
        &format_rank(opponent.average_arena_rank),
    ));
    section.push_str(&row(
        "Avg fleet rank",
        &format_rank(own.average_fleet_rank),
        &format_rank(opponent.average_fleet_rank),
    ));

    section
}

/// Generate the retrieval footer for one guild.
fn generate_footer(record: &AggregateRecord) -> String {
    let marker = if record.is_partial() { " (partial)" } else { "" };
    format!(
        "{}: {}/{} records retrieved{}\n",
        display_name(&record.name),
        record.success_count,
        record.member_count,
        marker
    )
}

fn format_rank(rank: Option<f64>) -> String {
    match rank {
        Some(rank) => format!("{:.1}", rank),
        None => "-".to_string(),
    }
}

/// Format an integer with thousands separators.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}
