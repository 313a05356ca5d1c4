//! Inbound wire messages and the validating decode step.
//!
//! Frames are JSON objects discriminated by `type`. Known kinds are decoded
//! into a typed shape; a known kind whose fields have the wrong JSON type is a
//! decode fault. Unknown kinds are let through as [`TableEvent::Unknown`].
//!
//! Every spelling a server has used for a field is its own `Option` here, so a
//! frame carrying two spellings of the same field still decodes. Choosing
//! between them is left to [`normalize`].

use crate::error::{DecodeError, Result};
use crate::event::{MessageKind, TableEvent};
use crate::normalize;
use crate::table::{KoudiReport, RoundSummary};
use serde::Deserialize;
use serde_json::Value;

/// One trick entry as servers have spelled it over time.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireTrickEntry {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub cards: Option<CardsField>,
    #[serde(default)]
    pub slingshot_failed: Option<bool>,
}

/// `cards` is usually a list but has been sent as a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CardsField {
    Many(Vec<String>),
    One(String),
}

/// A per-team pair under any of its spellings.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireTally<T> {
    #[serde(default)]
    pub team_a: Option<T>,
    #[serde(default, rename = "teamA")]
    pub team_a_camel: Option<T>,
    #[serde(default)]
    pub north_south: Option<T>,
    #[serde(default)]
    pub ns: Option<T>,
    #[serde(default)]
    pub team_b: Option<T>,
    #[serde(default, rename = "teamB")]
    pub team_b_camel: Option<T>,
    #[serde(default)]
    pub east_west: Option<T>,
    #[serde(default)]
    pub ew: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WirePlayer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub cards_count: Option<u32>,
    #[serde(default)]
    pub hand_size: Option<u32>,
    #[serde(default, rename = "handSize")]
    pub hand_size_camel: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireReady {
    #[serde(default)]
    pub ready_count: Option<u32>,
    #[serde(default)]
    pub total_players: Option<u32>,
    #[serde(default)]
    pub ready_player_ids: Option<Vec<String>>,
    #[serde(default)]
    pub ready_players: Option<Vec<String>>,
    #[serde(default)]
    pub player_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireSnapshot {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub dealer_position: Option<String>,
    #[serde(default)]
    pub dealer_player_id: Option<String>,
    #[serde(default)]
    pub dealer_has_bottom: Option<bool>,
    #[serde(default)]
    pub bottom_pending: Option<bool>,
    #[serde(default)]
    pub bottom_cards_count: Option<u32>,
    #[serde(default)]
    pub bottom_cards: Option<Vec<String>>,
    #[serde(default)]
    pub trump_suit: Option<String>,
    #[serde(default)]
    pub dealt_count: Option<u32>,
    #[serde(default)]
    pub players: Option<Vec<WirePlayer>>,
    #[serde(default)]
    pub idle_score: Option<i64>,
    #[serde(default)]
    pub scores: Option<WireTally<i64>>,
    #[serde(default)]
    pub team_scores: Option<WireTally<i64>>,
    #[serde(default)]
    pub tricks_won: Option<WireTally<u32>>,
    #[serde(default)]
    pub current_trick: Option<Vec<WireTrickEntry>>,
    #[serde(default)]
    pub last_trick: Option<Vec<WireTrickEntry>>,
    #[serde(default)]
    pub current_player: Option<String>,
    #[serde(default)]
    pub current_player_position: Option<String>,
    #[serde(default)]
    pub countdown: Option<i64>,
    #[serde(default)]
    pub remaining_time: Option<i64>,
    #[serde(default)]
    pub seconds_remaining: Option<i64>,
    #[serde(default)]
    pub countdown_active: Option<bool>,
    #[serde(default)]
    pub round_summary: Option<RoundSummary>,
    #[serde(default)]
    pub ready_for_next_round: Option<WireReady>,
    #[serde(default)]
    pub ready_to_start: Option<WireReady>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireDealTick {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub dealt_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WirePhase {
    #[serde(default)]
    pub phase: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireScore {
    #[serde(default)]
    pub idle_score: Option<i64>,
    #[serde(default)]
    pub scores: Option<WireTally<i64>>,
    #[serde(default)]
    pub ns: Option<i64>,
    #[serde(default)]
    pub ew: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WirePlayCard {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub cards: Option<CardsField>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireTrickWon {
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub trick_points: Option<i64>,
    #[serde(default)]
    pub tricks_won: Option<WireTally<u32>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireBottom {
    #[serde(default)]
    pub dealer_has_bottom: Option<bool>,
    #[serde(default)]
    pub bottom_pending: Option<bool>,
    #[serde(default)]
    pub bottom_cards_count: Option<u32>,
    #[serde(default)]
    pub bottom_cards: Option<Vec<String>>,
    #[serde(default)]
    pub dealer_player_id: Option<String>,
    #[serde(default)]
    pub dealer_position: Option<String>,
}

/// Shared by `card_played` and `auto_play`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WirePlay {
    #[serde(default)]
    pub current_trick: Option<Vec<WireTrickEntry>>,
    #[serde(default)]
    pub last_trick: Option<Vec<WireTrickEntry>>,
    #[serde(default)]
    pub trick_complete: Option<bool>,
    #[serde(default)]
    pub slingshot_failed: Option<bool>,
    #[serde(default)]
    pub current_player: Option<String>,
    #[serde(default)]
    pub current_player_position: Option<String>,
    #[serde(default)]
    pub auto_play_kind: Option<String>,
    #[serde(default)]
    pub auto_play_type: Option<String>,
    #[serde(default)]
    pub idle_score: Option<i64>,
    #[serde(default)]
    pub tricks_won: Option<WireTally<u32>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireTrickComplete {
    #[serde(default)]
    pub last_trick: Option<Vec<WireTrickEntry>>,
    #[serde(default)]
    pub trick: Option<Vec<WireTrickEntry>>,
    #[serde(default)]
    pub current_trick: Option<Vec<WireTrickEntry>>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub tricks_won: Option<WireTally<u32>>,
    #[serde(default)]
    pub idle_score: Option<i64>,
    #[serde(default)]
    pub current_player: Option<String>,
    #[serde(default)]
    pub current_player_position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireRoundEnd {
    #[serde(default)]
    pub round_summary: Option<RoundSummary>,
    #[serde(default)]
    pub summary: Option<RoundSummary>,
    #[serde(default)]
    pub ready_count: Option<u32>,
    #[serde(default)]
    pub total_players: Option<u32>,
    #[serde(default)]
    pub ready_player_ids: Option<Vec<String>>,
    #[serde(default)]
    pub ready_players: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WirePlayers {
    #[serde(default)]
    pub players: Option<Vec<WirePlayer>>,
    #[serde(default)]
    pub ready_to_start: Option<WireReady>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireCountdown {
    #[serde(default)]
    pub countdown: Option<i64>,
    #[serde(default)]
    pub remaining_time: Option<i64>,
    #[serde(default)]
    pub seconds_remaining: Option<i64>,
    #[serde(default)]
    pub countdown_active: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireEmpty {}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WireMessage {
    StateSnapshot(WireSnapshot),
    DealTick(WireDealTick),
    PhaseChanged(WirePhase),
    ScoreUpdated(WireScore),
    KoudiApplied(KoudiReport),
    PlayCard(WirePlayCard),
    TrickWon(WireTrickWon),
    BottomUpdated(WireBottom),
    CardPlayed(WirePlay),
    TrickComplete(WireTrickComplete),
    RoundEnd(WireRoundEnd),
    ReadyForNextRound(WireReady),
    ReadyToStart(WireReady),
    PlayersUpdated(WirePlayers),
    CountdownUpdated(WireCountdown),
    AutoPlay(WirePlay),
    Error(WireError),
    Pong(WireEmpty),
}

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub kind: MessageKind,
    /// The `type` string exactly as received, if there was one.
    pub declared_kind: Option<String>,
    pub event: TableEvent,
    pub raw: Value,
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> Result<Decoded> {
    let raw: Value = serde_json::from_str(text)?;
    decode_value(raw)
}

/// Decode an already-parsed JSON value.
pub fn decode_value(raw: Value) -> Result<Decoded> {
    let declared_kind = match &raw {
        Value::Object(map) => map.get("type").and_then(Value::as_str).map(str::to_owned),
        _ => return Err(DecodeError::NotAnObject),
    };

    let kind = declared_kind
        .as_deref()
        .map(MessageKind::from_wire)
        .unwrap_or(MessageKind::Unknown);

    let event = if kind == MessageKind::Unknown {
        TableEvent::Unknown {
            declared: declared_kind.clone(),
        }
    } else {
        let message = WireMessage::deserialize(&raw).map_err(|source| DecodeError::Shape {
            kind: kind.as_str(),
            source,
        })?;
        normalize::event(message)
    };

    Ok(Decoded {
        kind,
        declared_kind,
        event,
        raw,
    })
}
