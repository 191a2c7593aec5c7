//! Remote data provider access.
//!
//! Every call returns a [`Fetch`] outcome instead of an error so callers
//! can count failures without unwinding.

pub mod client;

pub use client::{ProviderClient, ProviderSettings};

use crate::models::{MemberDetail, Roster};
use async_trait::async_trait;
use thiserror::Error;

/// Outcome of a single provider call.
#[derive(Debug)]
pub enum Fetch<T> {
    /// The record was retrieved and parsed.
    Found(T),
    /// The provider answered with a non-success status.
    Absent,
    /// The call failed before a usable answer arrived.
    Error(RemoteError),
}

/// Failure detail for a provider call.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to provider: {0}")]
    Connect(String),

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Transport(String),
}

/// Read-only source of guild rosters and member details.
#[async_trait]
pub trait GuildDataSource: Send + Sync {
    /// Fetch the roster of a guild.
    async fn fetch_roster(&self, guild_id: &str) -> Fetch<Roster>;

    /// Fetch the detail record of one member.
    async fn fetch_member_detail(&self, member_id: &str) -> Fetch<MemberDetail>;
}
