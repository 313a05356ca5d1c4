//! Canonical table events.
//!
//! These are what the reconciler consumes. Every optional field means
//! "no update" when absent; wire-level shape drift has already been resolved
//! by [`normalize`](crate::normalize).

use crate::table::{KoudiReport, LastPlay, PlayerSeat, RoundSummary, Trick};
use serde::Serialize;
use std::fmt;
use tmir_core::{CardToken, Phase, Position, Suit, TeamTally};

/// Message discriminants as they appear in the `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    StateSnapshot,
    DealTick,
    PhaseChanged,
    ScoreUpdated,
    KoudiApplied,
    PlayCard,
    TrickWon,
    BottomUpdated,
    CardPlayed,
    TrickComplete,
    RoundEnd,
    ReadyForNextRound,
    ReadyToStart,
    PlayersUpdated,
    CountdownUpdated,
    AutoPlay,
    Error,
    Pong,
    Unknown,
}

impl MessageKind {
    pub const KNOWN: [MessageKind; 18] = [
        MessageKind::StateSnapshot,
        MessageKind::DealTick,
        MessageKind::PhaseChanged,
        MessageKind::ScoreUpdated,
        MessageKind::KoudiApplied,
        MessageKind::PlayCard,
        MessageKind::TrickWon,
        MessageKind::BottomUpdated,
        MessageKind::CardPlayed,
        MessageKind::TrickComplete,
        MessageKind::RoundEnd,
        MessageKind::ReadyForNextRound,
        MessageKind::ReadyToStart,
        MessageKind::PlayersUpdated,
        MessageKind::CountdownUpdated,
        MessageKind::AutoPlay,
        MessageKind::Error,
        MessageKind::Pong,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::StateSnapshot => "state_snapshot",
            MessageKind::DealTick => "deal_tick",
            MessageKind::PhaseChanged => "phase_changed",
            MessageKind::ScoreUpdated => "score_updated",
            MessageKind::KoudiApplied => "koudi_applied",
            MessageKind::PlayCard => "play_card",
            MessageKind::TrickWon => "trick_won",
            MessageKind::BottomUpdated => "bottom_updated",
            MessageKind::CardPlayed => "card_played",
            MessageKind::TrickComplete => "trick_complete",
            MessageKind::RoundEnd => "round_end",
            MessageKind::ReadyForNextRound => "ready_for_next_round",
            MessageKind::ReadyToStart => "ready_to_start",
            MessageKind::PlayersUpdated => "players_updated",
            MessageKind::CountdownUpdated => "countdown_updated",
            MessageKind::AutoPlay => "auto_play",
            MessageKind::Error => "error",
            MessageKind::Pong => "pong",
            MessageKind::Unknown => "message",
        }
    }

    /// Map a declared `type` to a kind; anything unrecognized is `Unknown`.
    pub fn from_wire(declared: &str) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|k| k.as_str() == declared)
            .unwrap_or(MessageKind::Unknown)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness update; see [`ReadySet::merge`](crate::table::ReadySet::merge).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReadyPatch {
    pub ready_count: Option<u32>,
    pub total_players: Option<u32>,
    pub ready_player_ids: Option<Vec<String>>,
    pub player_id: Option<String>,
}

impl ReadyPatch {
    pub fn is_empty(&self) -> bool {
        self.ready_count.is_none()
            && self.total_players.is_none()
            && self.ready_player_ids.is_none()
            && self.player_id.is_none()
    }
}

/// A roster entry. `hand_size` is absent when the server did not report it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub id: String,
    pub display_name: Option<String>,
    pub position: Position,
    pub hand_size: Option<u32>,
}

impl RosterEntry {
    /// Resolve into a seat, falling back to the hand size already known for this id.
    pub fn into_seat(self, previous: Option<&PlayerSeat>) -> PlayerSeat {
        let known = previous.map(|p| p.hand_size).unwrap_or(0);
        PlayerSeat {
            id: self.id,
            display_name: self.display_name,
            position: self.position,
            hand_size: self.hand_size.unwrap_or(known),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CountdownPatch {
    pub seconds_remaining: Option<u32>,
    pub active: Option<bool>,
}

/// A sparse full-state payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SnapshotPatch {
    pub room_id: Option<String>,
    pub phase: Option<Phase>,
    pub dealer_position: Option<Position>,
    pub dealer_player_id: Option<String>,
    pub dealer_has_bottom: Option<bool>,
    pub bottom_pending: Option<bool>,
    pub bottom_cards_count: Option<u32>,
    pub bottom_cards: Option<Vec<CardToken>>,
    pub trump_suit: Option<Suit>,
    pub dealt_count: Option<u32>,
    pub players: Option<Vec<RosterEntry>>,
    pub idle_score: Option<i64>,
    pub team_scores: Option<TeamTally<i64>>,
    pub tricks_won: Option<TeamTally<u32>>,
    pub current_trick: Option<Trick>,
    pub last_trick: Option<Trick>,
    pub current_player: Option<Position>,
    pub countdown: CountdownPatch,
    pub round_summary: Option<RoundSummary>,
    pub ready_for_next_round: Option<ReadyPatch>,
    pub ready_to_start: Option<ReadyPatch>,
}

/// One dealt card. `card` is absent when the card went to another seat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CardDealt {
    pub position: Option<Position>,
    /// The seat as spelled on the wire, kept for diagnostics when it did not map.
    pub raw_position: Option<String>,
    pub card: Option<CardToken>,
    pub dealt_count: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScorePatch {
    pub idle_score: Option<i64>,
    pub team_a: Option<i64>,
    pub team_b: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrickWon {
    pub winner: Option<Position>,
    pub trick_points: Option<i64>,
    pub tricks_won: Option<TeamTally<u32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BottomPatch {
    pub dealer_has_bottom: Option<bool>,
    pub bottom_pending: Option<bool>,
    pub bottom_cards_count: Option<u32>,
    pub bottom_cards: Option<Vec<CardToken>>,
    pub dealer_player_id: Option<String>,
    pub dealer_position: Option<Position>,
}

/// A card-played or auto-play notification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayEvent {
    pub current_trick: Option<Trick>,
    pub last_trick: Option<Trick>,
    pub trick_complete: bool,
    pub slingshot_failed: bool,
    pub current_player: Option<Position>,
    pub auto_play_kind: Option<String>,
    pub idle_score: Option<i64>,
    pub tricks_won: Option<TeamTally<u32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrickCompletion {
    pub last_trick: Option<Trick>,
    pub current_trick: Option<Trick>,
    pub winner: Option<Position>,
    pub tricks_won: Option<TeamTally<u32>>,
    pub idle_score: Option<i64>,
    pub current_player: Option<Position>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoundEnd {
    pub round_summary: Option<RoundSummary>,
    pub ready: ReadyPatch,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayersUpdate {
    pub players: Option<Vec<RosterEntry>>,
    pub ready_to_start: Option<ReadyPatch>,
}

/// Server-declared application error; passed through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServerError {
    pub message: Option<String>,
    pub code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableEvent {
    Snapshot(SnapshotPatch),
    CardDealt(CardDealt),
    PhaseChanged {
        phase: Option<Phase>,
        /// The phase as spelled on the wire, kept when it did not parse.
        raw: Option<String>,
    },
    ScoreUpdated(ScorePatch),
    KoudiApplied(KoudiReport),
    PlayCard(LastPlay),
    TrickWon(TrickWon),
    BottomUpdated(BottomPatch),
    CardPlayed(PlayEvent),
    TrickComplete(TrickCompletion),
    RoundEnd(RoundEnd),
    ReadyForNextRound(ReadyPatch),
    ReadyToStart(ReadyPatch),
    PlayersUpdated(PlayersUpdate),
    CountdownUpdated(CountdownPatch),
    AutoPlay(PlayEvent),
    ServerError(ServerError),
    Pong,
    /// A message whose `type` this client does not know, or that has none.
    Unknown { declared: Option<String> },
}

impl TableEvent {
    pub fn kind(&self) -> MessageKind {
        match self {
            TableEvent::Snapshot(_) => MessageKind::StateSnapshot,
            TableEvent::CardDealt(_) => MessageKind::DealTick,
            TableEvent::PhaseChanged { .. } => MessageKind::PhaseChanged,
            TableEvent::ScoreUpdated(_) => MessageKind::ScoreUpdated,
            TableEvent::KoudiApplied(_) => MessageKind::KoudiApplied,
            TableEvent::PlayCard(_) => MessageKind::PlayCard,
            TableEvent::TrickWon(_) => MessageKind::TrickWon,
            TableEvent::BottomUpdated(_) => MessageKind::BottomUpdated,
            TableEvent::CardPlayed(_) => MessageKind::CardPlayed,
            TableEvent::TrickComplete(_) => MessageKind::TrickComplete,
            TableEvent::RoundEnd(_) => MessageKind::RoundEnd,
            TableEvent::ReadyForNextRound(_) => MessageKind::ReadyForNextRound,
            TableEvent::ReadyToStart(_) => MessageKind::ReadyToStart,
            TableEvent::PlayersUpdated(_) => MessageKind::PlayersUpdated,
            TableEvent::CountdownUpdated(_) => MessageKind::CountdownUpdated,
            TableEvent::AutoPlay(_) => MessageKind::AutoPlay,
            TableEvent::ServerError(_) => MessageKind::Error,
            TableEvent::Pong => MessageKind::Pong,
            TableEvent::Unknown { .. } => MessageKind::Unknown,
        }
    }

    /// Whether re-delivering this event can change state a second time.
    pub fn is_increment(&self) -> bool {
        match self {
            TableEvent::CardDealt(_) => true,
            TableEvent::TrickWon(tw) => tw.tricks_won.is_none() && tw.winner.is_some(),
            _ => false,
        }
    }
}
