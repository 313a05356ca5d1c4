//! The reconciled view of one table.
//!
//! [`TableState`] is owned and mutated exclusively by the
//! [`Reconciler`](crate::reconciler::Reconciler); everything else reads it.

use crate::continuity::TrickHold;
use crate::event::ReadyPatch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tmir_core::{CardToken, Phase, Position, Suit, TeamTally};

/// A seated player as listed in the roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSeat {
    pub id: String,
    pub display_name: Option<String>,
    pub position: Position,
    pub hand_size: u32,
}

/// One seat's contribution to a trick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrickPlay {
    pub player_id: Option<String>,
    pub position: Position,
    pub cards: Vec<CardToken>,
    /// Set when this play replaced a rejected multi-card lead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slingshot_failed: Option<bool>,
}

impl TrickPlay {
    pub fn new(position: Position, cards: Vec<CardToken>) -> Self {
        Self {
            player_id: None,
            position,
            cards,
            slingshot_failed: None,
        }
    }

    pub fn is_slingshot_failure(&self) -> bool {
        self.slingshot_failed == Some(true)
    }
}

/// Plays in the order they were made; at most one entry per seat.
pub type Trick = Vec<TrickPlay>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub seconds_remaining: u32,
    pub active: bool,
}

/// Readiness tracked as explicit membership, not only as a counter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadySet {
    pub ready_count: u32,
    pub total_players: u32,
    pub ready_player_ids: BTreeSet<String>,
}

impl ReadySet {
    /// Merge a readiness update.
    ///
    /// An explicit id list replaces the membership and fixes the count. A lone
    /// player id is added to the existing membership. The count never drops
    /// below the number of known members. The total is only ever the value the
    /// server last sent; more members than that is logged, not corrected.
    pub fn merge(&mut self, patch: &ReadyPatch) {
        if let Some(total) = patch.total_players {
            self.total_players = total;
        }

        if let Some(ids) = &patch.ready_player_ids {
            self.ready_player_ids = ids.iter().cloned().collect();
            let members = self.member_count();
            if let Some(count) = patch.ready_count {
                if count != members {
                    tracing::debug!(
                        reported = count,
                        members,
                        "ready count disagrees with id list; using id list"
                    );
                }
            }
            self.ready_count = members;
        } else {
            if let Some(id) = &patch.player_id {
                self.ready_player_ids.insert(id.clone());
            }
            if let Some(count) = patch.ready_count {
                self.ready_count = count;
            }
            self.ready_count = self.ready_count.max(self.member_count());
        }

        let members = self.member_count();
        if self.total_players > 0 && members > self.total_players {
            tracing::debug!(
                members,
                total = self.total_players,
                "more ready members than reported players"
            );
        }
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.ready_player_ids.contains(player_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ready_count == 0 && self.ready_player_ids.is_empty()
    }

    fn member_count(&self) -> u32 {
        u32::try_from(self.ready_player_ids.len()).unwrap_or(u32::MAX)
    }
}

/// End-of-round report, adopted verbatim.
///
/// The well-known fields are typed; anything else the server adds (penalty
/// flags, per-seat breakdowns) is preserved in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    #[serde(default)]
    pub dealer_side: Option<String>,
    #[serde(default)]
    pub winner_side: Option<String>,
    #[serde(default)]
    pub idle_score: Option<i64>,
    #[serde(default)]
    pub bottom_score: Option<i64>,
    #[serde(default)]
    pub dealer_level_up: Option<i64>,
    #[serde(default)]
    pub idle_level_up: Option<i64>,
    #[serde(default)]
    pub dealer_wins: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Bottom-exchange scoring report ("koudi"), display only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KoudiReport {
    #[serde(default)]
    pub bottom_score: Option<i64>,
    #[serde(default)]
    pub multiplier: Option<i64>,
    #[serde(default)]
    pub bonus: Option<i64>,
}

/// The most recent animated play announcement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPlay {
    pub position: Position,
    pub cards: Vec<CardToken>,
}

/// Client-side mirror of the table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    pub room_id: Option<String>,
    pub phase: Phase,

    pub dealer_position: Option<Position>,
    pub dealer_player_id: Option<String>,
    pub dealer_has_bottom: bool,
    pub bottom_pending: bool,
    pub bottom_cards_count: u32,
    pub bottom_cards: Vec<CardToken>,
    pub trump_suit: Option<Suit>,

    pub players: Vec<PlayerSeat>,

    /// Points taken by the non-dealer side.
    pub idle_score: i64,
    pub team_scores: TeamTally<i64>,
    pub tricks_won: TeamTally<u32>,

    pub current_trick: Trick,
    pub last_trick: Trick,
    pub last_trick_winner: Option<Position>,
    pub current_player_position: Option<Position>,
    pub auto_play_kind: Option<String>,
    pub trick_hold: TrickHold,

    pub countdown: Countdown,
    pub round_summary: Option<RoundSummary>,
    pub ready_for_next_round: ReadySet,
    pub ready_to_start: ReadySet,

    /// Illustrative per-seat accumulation of dealt cards; not the authoritative hand.
    pub demo_hands: BTreeMap<Position, Vec<CardToken>>,
    pub dealt_count: u32,

    pub koudi: Option<KoudiReport>,
    pub last_play: Option<LastPlay>,
}

impl TableState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a completed trick is being held on screen.
    pub fn waiting_for_next_trick(&self) -> bool {
        self.trick_hold.is_holding()
    }

    pub fn player(&self, id: &str) -> Option<&PlayerSeat> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_at(&self, position: Position) -> Option<&PlayerSeat> {
        self.players.iter().find(|p| p.position == position)
    }

    pub fn demo_hand(&self, position: Position) -> &[CardToken] {
        self.demo_hands
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
