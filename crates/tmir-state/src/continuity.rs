//! Trick display continuity.
//!
//! A completed trick stays on screen until the next trick is led, even if the
//! server reports an empty trick in between. The rule is a two-state machine:
//!
//! ```text
//!                    TrickCompleted
//!   AcceptingNewTrick ────────────▶ HoldingPreviousTrick
//!          ▲                                 │
//!          └──── LeadObserved / NewDeal ─────┘
//! ```
//!
//! While holding, an empty incoming trick is ignored and a failed slingshot
//! replay is not mistaken for a lead. A non-empty trick that is not a lead
//! still overwrites: it is the server replaying the completed trick.

use crate::table::TrickPlay;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrickHold {
    #[default]
    AcceptingNewTrick,
    HoldingPreviousTrick,
}

/// What moves the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldTrigger {
    /// A trick-complete flag or a dedicated completion event.
    TrickCompleted,
    /// The phase moved to `waiting` or `dealing`.
    NewDealStarted,
    /// A play event produced a trick with exactly one genuine entry.
    LeadObserved,
}

/// Where an incoming `current_trick` came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrickSource {
    Snapshot,
    Play,
    /// Delivered together with a trick-complete signal; never a lead.
    Completion,
}

/// Decision for an incoming `current_trick`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Overwrite the displayed trick and release the hold.
    StartNewTrick,
    /// Overwrite the displayed trick; the hold is unchanged.
    Replace,
    /// Keep the displayed trick.
    Ignore,
}

impl TrickHold {
    pub fn is_holding(self) -> bool {
        self == TrickHold::HoldingPreviousTrick
    }

    pub fn on(self, trigger: HoldTrigger) -> Self {
        match trigger {
            HoldTrigger::TrickCompleted => TrickHold::HoldingPreviousTrick,
            HoldTrigger::NewDealStarted | HoldTrigger::LeadObserved => {
                TrickHold::AcceptingNewTrick
            }
        }
    }

    /// Decide how an incoming trick affects the displayed one.
    ///
    /// `slingshot_failed` is the message-level flag; a single entry flagged
    /// the same way counts too.
    pub fn admit(
        self,
        source: TrickSource,
        incoming: &[TrickPlay],
        slingshot_failed: bool,
    ) -> Admission {
        let failed = slingshot_failed
            || (incoming.len() == 1 && incoming[0].is_slingshot_failure());

        if source == TrickSource::Play && incoming.len() == 1 && !failed {
            return Admission::StartNewTrick;
        }

        match self {
            TrickHold::AcceptingNewTrick => Admission::Replace,
            TrickHold::HoldingPreviousTrick => {
                if incoming.is_empty() || (incoming.len() == 1 && failed) {
                    Admission::Ignore
                } else {
                    Admission::Replace
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmir_core::{CardToken, Position};

    fn play(pos: Position, card: &str) -> TrickPlay {
        TrickPlay::new(pos, vec![CardToken::from(card)])
    }

    fn failed(pos: Position, card: &str) -> TrickPlay {
        TrickPlay {
            slingshot_failed: Some(true),
            ..play(pos, card)
        }
    }

    #[test]
    fn test_transitions() {
        let hold = TrickHold::default();
        assert!(!hold.is_holding());

        let hold = hold.on(HoldTrigger::TrickCompleted);
        assert!(hold.is_holding());

        assert!(!hold.on(HoldTrigger::LeadObserved).is_holding());
        assert!(!hold.on(HoldTrigger::NewDealStarted).is_holding());
    }

    #[test]
    fn test_holding_ignores_empty_trick() {
        let hold = TrickHold::HoldingPreviousTrick;
        assert_eq!(hold.admit(TrickSource::Snapshot, &[], false), Admission::Ignore);
        assert_eq!(hold.admit(TrickSource::Play, &[], false), Admission::Ignore);
    }

    #[test]
    fn test_accepting_takes_empty_trick() {
        let hold = TrickHold::AcceptingNewTrick;
        assert_eq!(hold.admit(TrickSource::Snapshot, &[], false), Admission::Replace);
    }

    #[test]
    fn test_single_genuine_play_is_a_lead() {
        let lead = [play(Position::East, "2♠")];
        for hold in [TrickHold::AcceptingNewTrick, TrickHold::HoldingPreviousTrick] {
            assert_eq!(hold.admit(TrickSource::Play, &lead, false), Admission::StartNewTrick);
        }
    }

    #[test]
    fn test_snapshot_single_entry_is_not_a_lead() {
        let lead = [play(Position::East, "2♠")];
        assert_eq!(
            TrickHold::HoldingPreviousTrick.admit(TrickSource::Snapshot, &lead, false),
            Admission::Replace
        );
    }

    #[test]
    fn test_failed_slingshot_is_not_a_lead() {
        let hold = TrickHold::HoldingPreviousTrick;
        assert_eq!(
            hold.admit(TrickSource::Play, &[failed(Position::North, "A♠")], false),
            Admission::Ignore
        );
        assert_eq!(
            hold.admit(TrickSource::Play, &[play(Position::North, "A♠")], true),
            Admission::Ignore
        );
    }

    #[test]
    fn test_completion_adopts_only_non_empty_tricks() {
        let hold = TrickHold::HoldingPreviousTrick;
        let echo = [play(Position::North, "A♠")];
        assert_eq!(hold.admit(TrickSource::Completion, &[], false), Admission::Ignore);
        assert_eq!(hold.admit(TrickSource::Completion, &echo, false), Admission::Replace);
    }

    #[test]
    fn test_holding_accepts_replayed_trick() {
        let replay = [
            play(Position::North, "A♠"),
            play(Position::East, "3♠"),
            play(Position::South, "K♠"),
            play(Position::West, "5♠"),
        ];
        assert_eq!(
            TrickHold::HoldingPreviousTrick.admit(TrickSource::Play, &replay, false),
            Admission::Replace
        );
    }
}
