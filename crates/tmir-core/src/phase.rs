//! Table phases. The server drives every transition; the client never validates them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Waiting,
    Dealing,
    Bidding,
    Playing,
    Bottom,
    Scoring,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Waiting,
        Phase::Dealing,
        Phase::Bidding,
        Phase::Playing,
        Phase::Bottom,
        Phase::Scoring,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Dealing => "dealing",
            Phase::Bidding => "bidding",
            Phase::Playing => "playing",
            Phase::Bottom => "bottom",
            Phase::Scoring => "scoring",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
    }

    /// Phases that can only be entered before any card of a new deal is played.
    pub fn precedes_first_trick(self) -> bool {
        matches!(self, Phase::Waiting | Phase::Dealing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse() {
        assert_eq!(Phase::parse("bidding"), Some(Phase::Bidding));
        assert_eq!(Phase::parse("PLAYING"), Some(Phase::Playing));
        assert_eq!(Phase::parse("finished"), None);
    }

    #[test]
    fn test_precedes_first_trick() {
        assert!(Phase::Dealing.precedes_first_trick());
        assert!(Phase::Waiting.precedes_first_trick());
        assert!(!Phase::Playing.precedes_first_trick());
    }
}
