//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::geometry::GeoPoint;
use crate::game::pickup::Weapon;
use crate::game::player::PlayerStatus;
use crate::game::session::SessionSummary;
use crate::game::team::TeamColor;
use crate::util::time::format_duration;

/// Messages sent from client to server: `{"Action": ..., "Data": ...}`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "Action", content = "Data")]
pub enum ClientMsg {
    /// Name and icon for this connection
    RegisterPlayer(PlayerIdentity),

    CreateGame(CreateGameRequest),

    /// List games open for joining
    ShowGames {},

    ShowGameInfo {
        #[serde(rename = "GameID")]
        game_id: String,
    },

    JoinGame {
        #[serde(rename = "GameID")]
        game_id: String,
        #[serde(rename = "Password", default)]
        password: String,
    },

    LeaveGame {},

    /// Host only
    StartGame {},

    /// Position report, in degrees
    LocationUpdate {
        #[serde(rename = "Location")]
        location: GeoPoint,
        #[serde(rename = "Orientation", default)]
        orientation: f64,
    },
}

impl ClientMsg {
    /// Action name, for logging
    pub fn action(&self) -> &'static str {
        match self {
            ClientMsg::RegisterPlayer(_) => "RegisterPlayer",
            ClientMsg::CreateGame(_) => "CreateGame",
            ClientMsg::ShowGames {} => "ShowGames",
            ClientMsg::ShowGameInfo { .. } => "ShowGameInfo",
            ClientMsg::JoinGame { .. } => "JoinGame",
            ClientMsg::LeaveGame {} => "LeaveGame",
            ClientMsg::StartGame {} => "StartGame",
            ClientMsg::LocationUpdate { .. } => "LocationUpdate",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerIdentity {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

/// Raw game creation request. Validated into a `SessionConfig`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGameRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub description: String,
    pub player_limit: Option<i64>,
    /// Absent for payload games
    pub point_limit: Option<i64>,
    /// Go-style duration, e.g. "10m" or "0h10m0s"
    pub time_limit: Option<String>,
    pub mode: Option<String>,
    #[serde(default)]
    pub boundaries: Vec<GeoPoint>,
    #[serde(rename = "NumCP")]
    pub num_cp: Option<i64>,
    /// Registers the connection when it has not registered yet
    pub host: Option<PlayerIdentity>,
}

/// Messages sent from server to client: `{"Type": ..., "Data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type", content = "Data")]
pub enum ServerMsg {
    Registered {
        #[serde(rename = "PlayerID")]
        player_id: String,
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Icon")]
        icon: String,
    },

    GameCreated {
        #[serde(rename = "GameID")]
        game_id: String,
    },

    /// Human readable reason
    CreateGameError(String),

    AvailableGames(Vec<GameListing>),

    GameInfo(GameDetails),

    /// One of the `JoinError` tags
    JoinGameError(String),

    PlayerListUpdate(Vec<PlayerInfo>),

    /// The game was closed by its host
    LeaveGame,

    GameStartInfo(GameStartInfo),

    GameUpdate(GameUpdate),

    StatusUpdate(PlayerStatus),

    VitalsUpdate(Vitals),

    AcquireWeapon(Weapon),

    PickupUpdate(PickupUpdate),

    /// Winning team name, or "Draw"
    Gameover(String),

    Error(String),
}

impl ServerMsg {
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMsg::Registered { .. } => "Registered",
            ServerMsg::GameCreated { .. } => "GameCreated",
            ServerMsg::CreateGameError(_) => "CreateGameError",
            ServerMsg::AvailableGames(_) => "AvailableGames",
            ServerMsg::GameInfo(_) => "GameInfo",
            ServerMsg::JoinGameError(_) => "JoinGameError",
            ServerMsg::PlayerListUpdate(_) => "PlayerListUpdate",
            ServerMsg::LeaveGame => "LeaveGame",
            ServerMsg::GameStartInfo(_) => "GameStartInfo",
            ServerMsg::GameUpdate(_) => "GameUpdate",
            ServerMsg::StatusUpdate(_) => "StatusUpdate",
            ServerMsg::VitalsUpdate(_) => "VitalsUpdate",
            ServerMsg::AcquireWeapon(_) => "AcquireWeapon",
            ServerMsg::PickupUpdate(_) => "PickupUpdate",
            ServerMsg::Gameover(_) => "Gameover",
            ServerMsg::Error(_) => "Error",
        }
    }
}

/// Public player info (roster entries)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerInfo {
    pub name: String,
    pub icon: String,
}

/// Entry of the open games list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameListing {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub mode: String,
    /// Center of the play area
    pub location: GeoPoint,
    pub player_list: Vec<PlayerInfo>,
    pub player_limit: u32,
    pub has_password: bool,
}

impl From<&SessionSummary> for GameListing {
    fn from(s: &SessionSummary) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            mode: s.mode.to_string(),
            location: s.center,
            player_list: s.roster.clone(),
            player_limit: s.player_limit,
            has_password: s.has_password,
        }
    }
}

/// Full description of one game, sent on join and on request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameDetails {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub mode: String,
    pub status: String,
    pub player_limit: u32,
    /// 0 for payload games
    pub point_limit: u32,
    pub time_limit: String,
    pub boundaries: Vec<GeoPoint>,
    pub player_list: Vec<PlayerInfo>,
}

impl From<&SessionSummary> for GameDetails {
    fn from(s: &SessionSummary) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            description: s.description.clone(),
            mode: s.mode.to_string(),
            status: s.status.to_string(),
            player_limit: s.player_limit,
            point_limit: s.point_limit.unwrap_or(0),
            time_limit: format_duration(s.time_limit),
            boundaries: s.boundaries.clone(),
            player_list: s.roster.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamAssignment {
    pub name: String,
    pub team: TeamColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseInfo {
    pub location: GeoPoint,
    /// Meters
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectiveInfo {
    #[serde(rename = "ID")]
    pub id: String,
    pub location: GeoPoint,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PickupInfo {
    pub location: GeoPoint,
    /// "Health", "Armor" or "Weapon"
    #[serde(rename = "Type")]
    pub kind: String,
    pub amount: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon: Option<Weapon>,
    pub available: bool,
}

/// Countdown announcement with the full map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameStartInfo {
    pub player_list: Vec<TeamAssignment>,
    pub objectives: Vec<ObjectiveInfo>,
    pub pickups: Vec<PickupInfo>,
    pub red_base: BaseInfo,
    pub blue_base: BaseInfo,
    /// RFC 3339
    pub start_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerPosition {
    pub name: String,
    pub team: Option<TeamColor>,
    pub location: Option<GeoPoint>,
    pub orientation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Points {
    pub red: u32,
    pub blue: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectiveState {
    #[serde(rename = "ID")]
    pub id: String,
    pub location: GeoPoint,
    /// Names of the players inside the radius
    pub occupying: Vec<String>,
    /// Team name or "Neutral"
    pub belongs_to: String,
    pub progress: u32,
}

/// Periodic game state snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameUpdate {
    pub player_list: Vec<PlayerPosition>,
    pub points: Points,
    pub objectives: Vec<ObjectiveState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vitals {
    pub health: u32,
    pub armor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PickupUpdate {
    pub location: GeoPoint,
    pub available: bool,
}
