//! Seats and the two fixed partnerships.
//!
//! North/South form team A, East/West form team B. The server spells seats in
//! lower case while older clients used upper case, so parsing is
//! case-insensitive and the canonical (serialized) spelling is upper case.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four compass seats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    North,
    East,
    South,
    West,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::North,
        Position::East,
        Position::South,
        Position::West,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::North => "NORTH",
            Position::East => "EAST",
            Position::South => "SOUTH",
            Position::West => "WEST",
        }
    }

    /// Case-insensitive parse of a seat name; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
    }

    pub fn team(self) -> Team {
        match self {
            Position::North | Position::South => Team::NorthSouth,
            Position::East | Position::West => Team::EastWest,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two partnerships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Team A: North and South.
    NorthSouth,
    /// Team B: East and West.
    EastWest,
}

impl Team {
    /// Accepts `north_south`/`team_a`/`a` and `east_west`/`team_b`/`b` in any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north_south" | "ns" | "team_a" | "teama" | "a" => Some(Team::NorthSouth),
            "east_west" | "ew" | "team_b" | "teamb" | "b" => Some(Team::EastWest),
            _ => None,
        }
    }
}

/// A per-team value such as tricks won or a team score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamTally<T> {
    pub team_a: T,
    pub team_b: T,
}

impl<T: Copy> TeamTally<T> {
    pub fn new(team_a: T, team_b: T) -> Self {
        Self { team_a, team_b }
    }

    pub fn get(&self, team: Team) -> T {
        match team {
            Team::NorthSouth => self.team_a,
            Team::EastWest => self.team_b,
        }
    }

    pub fn get_mut(&mut self, team: Team) -> &mut T {
        match team {
            Team::NorthSouth => &mut self.team_a,
            Team::EastWest => &mut self.team_b,
        }
    }
}

impl TeamTally<u32> {
    pub fn total(&self) -> u32 {
        self.team_a.saturating_add(self.team_b)
    }
}
