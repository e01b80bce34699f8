//! Teams and their bases

use serde::Serialize;

use super::geometry::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TeamColor {
    Red,
    Blue,
}

impl TeamColor {
    pub fn name(self) -> &'static str {
        match self {
            TeamColor::Red => "Red",
            TeamColor::Blue => "Blue",
        }
    }
}

/// One of the two teams of a session. Created with the session and never
/// replaced; only the score changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub color: TeamColor,
    pub base: Location,
    pub base_radius: f64,
    pub points: u32,
}

impl Team {
    pub fn new(color: TeamColor, base: Location, base_radius: f64) -> Self {
        Self {
            color,
            base,
            base_radius,
            points: 0,
        }
    }
}
