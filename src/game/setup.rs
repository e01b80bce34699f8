//! Game creation request validation

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use super::error::SetupError;
use super::geometry::{Boundary, GeoPoint};
use crate::util::time::{format_duration, parse_duration};
use crate::ws::protocol::CreateGameRequest;

pub const MIN_PLAYER_LIMIT: u32 = 2;
pub const MAX_PLAYER_LIMIT: u32 = 64;
pub const MAX_CONTROL_POINTS: usize = 16;
/// Longest side of the boundary's bounding box (meters)
pub const MAX_BOUNDARY_EXTENT: f64 = 2000.0;
/// Longest game allowed
pub const MAX_TIME_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GameMode {
    SingleCap,
    MultiCap,
    Payload,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::SingleCap => "SingleCap",
            GameMode::MultiCap => "MultiCap",
            GameMode::Payload => "Payload",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SingleCap" => Ok(GameMode::SingleCap),
            "MultiCap" => Ok(GameMode::MultiCap),
            "Payload" => Ok(GameMode::Payload),
            other => Err(SetupError::invalid("Mode", format!("unknown mode {other:?}"))),
        }
    }
}

/// A validated creation request
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub password: String,
    pub description: String,
    pub player_limit: u32,
    /// `None` only for payload games
    pub point_limit: Option<u32>,
    pub time_limit: Duration,
    pub mode: GameMode,
    pub boundary: Boundary,
    /// Vertices as received, echoed back to clients
    pub geo_boundary: Vec<GeoPoint>,
    pub control_points: usize,
}

impl SessionConfig {
    pub fn from_request(req: CreateGameRequest) -> Result<Self, SetupError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(SetupError::MissingField("Name"));
        }

        let mode: GameMode = req
            .mode
            .as_deref()
            .ok_or(SetupError::MissingField("Mode"))?
            .parse()?;

        let player_limit = req.player_limit.ok_or(SetupError::MissingField("PlayerLimit"))?;
        let player_limit = u32::try_from(player_limit)
            .ok()
            .filter(|n| (MIN_PLAYER_LIMIT..=MAX_PLAYER_LIMIT).contains(n))
            .ok_or_else(|| {
                SetupError::invalid(
                    "PlayerLimit",
                    format!("must be between {MIN_PLAYER_LIMIT} and {MAX_PLAYER_LIMIT}"),
                )
            })?;

        let point_limit = match (mode, req.point_limit) {
            // Payload games end on delivery or timeout
            (GameMode::Payload, _) => None,
            (_, None) => return Err(SetupError::MissingField("PointLimit")),
            (_, Some(n)) => Some(
                u32::try_from(n)
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| SetupError::invalid("PointLimit", "must be positive"))?,
            ),
        };

        let time_limit = req
            .time_limit
            .as_deref()
            .ok_or(SetupError::MissingField("TimeLimit"))?;
        let time_limit = parse_duration(time_limit)
            .map_err(|e| SetupError::invalid("TimeLimit", e.to_string()))?;
        if time_limit.is_zero() {
            return Err(SetupError::invalid("TimeLimit", "must be positive"));
        }
        if time_limit > MAX_TIME_LIMIT {
            return Err(SetupError::invalid(
                "TimeLimit",
                format!("must be at most {}", format_duration(MAX_TIME_LIMIT)),
            ));
        }

        let control_points = match mode {
            GameMode::MultiCap => {
                let n = req.num_cp.ok_or(SetupError::MissingField("NumCP"))?;
                usize::try_from(n)
                    .ok()
                    .filter(|n| (1..=MAX_CONTROL_POINTS).contains(n))
                    .ok_or_else(|| {
                        SetupError::invalid(
                            "NumCP",
                            format!("must be between 1 and {MAX_CONTROL_POINTS}"),
                        )
                    })?
            }
            GameMode::SingleCap | GameMode::Payload => 1,
        };

        let boundary = Boundary::from_geo(&req.boundaries)?;
        let extent = boundary.bounding_box().max_extent();
        if extent > MAX_BOUNDARY_EXTENT {
            return Err(SetupError::invalid(
                "Boundaries",
                format!("play area spans {extent:.0} m, limit is {MAX_BOUNDARY_EXTENT:.0} m"),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            password: req.password,
            description: req.description,
            player_limit,
            point_limit,
            time_limit,
            mode,
            boundary,
            geo_boundary: req.boundaries,
            control_points,
        })
    }
}
