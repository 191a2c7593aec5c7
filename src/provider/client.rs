//! HTTP client for the guild data provider.
//!
//! Both endpoints answer with a JSON body whose payload sits under a
//! top-level `data` object. Wire types are private to this module and
//! converted into the crate models on arrival.

use super::{Fetch, GuildDataSource, RemoteError};
use crate::models::{Decoration, MemberDetail, OwnedUnit, Roster, RosterEntry};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for the provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// API root, e.g. `https://swgoh.gg/api`.
    pub base_url: String,
    /// Header carrying the access credential.
    pub access_header: String,
    pub access_key: String,
    pub timeout_seconds: u64,
}

/// Provider client backed by `reqwest`.
pub struct ProviderClient {
    settings: ProviderSettings,
    http_client: reqwest::Client,
}

impl ProviderClient {
    /// Create a client with the configured per-request timeout.
    pub fn new(settings: ProviderSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    fn roster_url(&self, guild_id: &str) -> Option<String> {
        self.endpoint_url("guild-profile", guild_id)
    }

    fn member_url(&self, member_id: &str) -> Option<String> {
        self.endpoint_url("player", member_id)
    }

    /// Build `{base}/{endpoint}/{id}/` with the id encoded as a single path
    /// segment. Ids that would resolve as dot segments are refused.
    fn endpoint_url(&self, endpoint: &str, id: &str) -> Option<String> {
        if matches!(id, "" | "." | "..") {
            return None;
        }
        Some(format!(
            "{}/{}/{}/",
            self.settings.base_url.trim_end_matches('/'),
            endpoint,
            urlencoding::encode(id)
        ))
    }

    /// Issue a GET and decode the body, mapping every failure to a `Fetch`.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Fetch<T> {
        debug!("GET {}", url);

        let response = match self
            .http_client
            .get(url)
            .header(
                self.settings.access_header.as_str(),
                self.settings.access_key.as_str(),
            )
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Fetch::Error(self.classify(e)),
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Provider returned {} for {}", status, url);
            return Fetch::Absent;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Fetch::Error(self.classify(e)),
        };

        match serde_json::from_slice::<T>(&body) {
            Ok(value) => Fetch::Found(value),
            Err(e) => {
                warn!("Failed to decode provider response from {}: {}", url, e);
                Fetch::Error(RemoteError::Decode(e.to_string()))
            }
        }
    }

    fn classify(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout(self.settings.timeout_seconds)
        } else if e.is_connect() {
            RemoteError::Connect(self.settings.base_url.clone())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl GuildDataSource for ProviderClient {
    async fn fetch_roster(&self, guild_id: &str) -> Fetch<Roster> {
        let Some(url) = self.roster_url(guild_id) else {
            warn!("Refusing roster lookup for guild id {:?}", guild_id);
            return Fetch::Absent;
        };
        match self.get_json::<RosterEnvelope>(&url).await {
            Fetch::Found(envelope) => Fetch::Found(envelope.into()),
            Fetch::Absent => Fetch::Absent,
            Fetch::Error(e) => {
                warn!("Roster fetch for guild {} failed: {}", guild_id, e);
                Fetch::Error(e)
            }
        }
    }

    async fn fetch_member_detail(&self, member_id: &str) -> Fetch<MemberDetail> {
        let Some(url) = self.member_url(member_id) else {
            debug!("Refusing member lookup for id {:?}", member_id);
            return Fetch::Absent;
        };
        match self.get_json::<PlayerEnvelope>(&url).await {
            Fetch::Found(envelope) => Fetch::Found(envelope.into()),
            Fetch::Absent => Fetch::Absent,
            Fetch::Error(e) => {
                debug!("Member fetch for {} failed: {}", member_id, e);
                Fetch::Error(e)
            }
        }
    }
}

/// Member keys arrive as numbers or strings depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MemberKey {
    Number(u64),
    Text(String),
}

impl MemberKey {
    fn into_string(self) -> String {
        match self {
            MemberKey::Number(n) => n.to_string(),
            MemberKey::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RosterEnvelope {
    data: GuildData,
}

#[derive(Debug, Deserialize)]
struct GuildData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    members: Vec<GuildMember>,
}

#[derive(Debug, Deserialize)]
struct GuildMember {
    ally_code: MemberKey,
    #[serde(default)]
    player_name: String,
    #[serde(default)]
    galactic_power: u64,
    #[serde(default)]
    league_id: Option<String>,
}

impl From<RosterEnvelope> for Roster {
    fn from(envelope: RosterEnvelope) -> Self {
        Roster {
            name: envelope.data.name,
            members: envelope
                .data
                .members
                .into_iter()
                .map(|m| RosterEntry {
                    member_id: m.ally_code.into_string(),
                    name: m.player_name,
                    power: m.galactic_power,
                    league: m.league_id,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlayerEnvelope {
    #[serde(default)]
    data: PlayerData,
    #[serde(default)]
    units: Vec<UnitEnvelope>,
    #[serde(default)]
    datacrons: Vec<DatacronData>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerData {
    #[serde(default)]
    arena_rank: Option<u32>,
    #[serde(default)]
    fleet_arena: Option<FleetArena>,
}

#[derive(Debug, Deserialize)]
struct FleetArena {
    #[serde(default)]
    rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UnitEnvelope {
    data: UnitData,
}

#[derive(Debug, Deserialize)]
struct UnitData {
    base_id: String,
    #[serde(default)]
    is_galactic_legend: bool,
}

#[derive(Debug, Deserialize)]
struct DatacronData {
    /// Kept loose: a tier that is not a small integer counts as unknown.
    #[serde(default)]
    tier: Option<serde_json::Value>,
    #[serde(default)]
    template_base_id: String,
}

impl From<PlayerEnvelope> for MemberDetail {
    fn from(envelope: PlayerEnvelope) -> Self {
        MemberDetail {
            units: envelope
                .units
                .into_iter()
                .map(|u| OwnedUnit {
                    base_id: u.data.base_id,
                    top_tier: u.data.is_galactic_legend,
                })
                .collect(),
            decorations: envelope
                .datacrons
                .into_iter()
                .map(|d| Decoration {
                    tier: d
                        .tier
                        .as_ref()
                        .and_then(|t| t.as_u64())
                        .and_then(|t| u32::try_from(t).ok()),
                    template_id: d.template_base_id,
                })
                .collect(),
            arena_rank: envelope.data.arena_rank,
            fleet_rank: envelope.data.fleet_arena.and_then(|f| f.rank),
        }
    }
}
