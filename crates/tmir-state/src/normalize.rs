//! The normalization boundary.
//!
//! Everything that varies between server versions is resolved here: seat
//! spelling and case, singular `card` versus plural `cards`, duplicate trick
//! entries, roster entries without an id. The reconciler only ever sees the
//! canonical [`TableEvent`] shapes.

use crate::event::{
    BottomPatch, CardDealt, CountdownPatch, PlayEvent, PlayersUpdate, ReadyPatch, RosterEntry,
    RoundEnd, ScorePatch, ServerError, SnapshotPatch, TableEvent, TrickCompletion, TrickWon,
};
use crate::table::{LastPlay, RoundSummary, Trick, TrickPlay};
use crate::wire::{
    CardsField, WireMessage, WirePlay, WirePlayer, WireReady, WireSnapshot, WireTally,
    WireTrickEntry,
};
use serde_json::{Map, Value};
use tmir_core::{CardToken, Phase, Position, Suit, TeamTally};

const LOG_TARGET: &str = "tmir_state::normalize";

/// Parse a seat in any case. Unknown spellings are dropped with a warning.
pub fn position(raw: &str) -> Option<Position> {
    let parsed = Position::parse(raw);
    if parsed.is_none() {
        tracing::warn!(target: LOG_TARGET, seat = raw, "unrecognized seat");
    }
    parsed
}

fn opt_position(raw: Option<String>) -> Option<Position> {
    raw.as_deref().and_then(position)
}

/// Parse a phase; anything unrecognized is treated as absent.
pub fn phase(raw: &str) -> Option<Phase> {
    let parsed = Phase::parse(raw);
    if parsed.is_none() {
        tracing::warn!(target: LOG_TARGET, phase = raw, "unrecognized phase");
    }
    parsed
}

/// Canonicalize a token list, dropping blank tokens.
pub fn tokens<I, S>(raw: I) -> Vec<CardToken>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    raw.into_iter()
        .map(|s| CardToken::from(s.into()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Pick between the spellings of one field. The first one present wins, so
/// callers list the current name first.
pub(crate) fn coalesce<T, const N: usize>(spellings: [Option<T>; N]) -> Option<T> {
    spellings.into_iter().flatten().next()
}

/// Resolve a per-team pair. A pair with only one side is treated as absent.
pub(crate) fn tally<T: Copy>(raw: WireTally<T>) -> Option<TeamTally<T>> {
    let team_a = coalesce([raw.team_a_camel, raw.team_a, raw.north_south, raw.ns]);
    let team_b = coalesce([raw.team_b_camel, raw.team_b, raw.east_west, raw.ew]);
    match (team_a, team_b) {
        (Some(a), Some(b)) => Some(TeamTally::new(a, b)),
        (None, None) => None,
        _ => {
            tracing::warn!(target: LOG_TARGET, "team pair with one side missing");
            None
        }
    }
}

fn take_str(extra: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let key = keys.iter().find(|k| extra.get(**k).is_some_and(Value::is_string))?;
    match extra.remove(*key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn take_i64(extra: &mut Map<String, Value>, keys: &[&str]) -> Option<i64> {
    let key = keys.iter().find(|k| extra.get(**k).and_then(Value::as_i64).is_some())?;
    extra.remove(*key).and_then(|v| v.as_i64())
}

/// Fill the typed summary fields from older spellings left in `extra`.
pub(crate) fn round_summary(mut summary: RoundSummary) -> RoundSummary {
    if summary.winner_side.is_none() {
        summary.winner_side = take_str(&mut summary.extra, &["winning_side", "winner"]);
    }
    if summary.idle_score.is_none() {
        summary.idle_score = take_i64(&mut summary.extra, &["total_score", "final_idle_score"]);
    }
    summary
}

/// Merge the singular and plural card fields into one list.
///
/// The plural field wins when both are present and non-empty.
pub(crate) fn cards(card: Option<String>, many: Option<CardsField>) -> Vec<CardToken> {
    let plural = match many {
        Some(CardsField::Many(list)) => tokens(list),
        Some(CardsField::One(one)) => tokens([one]),
        None => Vec::new(),
    };
    if !plural.is_empty() {
        return plural;
    }
    tokens(card)
}

/// Canonicalize a trick.
///
/// Entries without a recognizable seat are dropped. A seat appearing twice
/// keeps its first position in play order and the latest contents.
pub(crate) fn trick(entries: Vec<WireTrickEntry>) -> Trick {
    let mut out: Trick = Vec::with_capacity(entries.len());
    for entry in entries {
        let seat = coalesce([entry.position, entry.pos, entry.player, entry.seat]);
        let Some(pos) = opt_position(seat) else {
            continue;
        };
        let play = TrickPlay {
            player_id: coalesce([entry.player_id, entry.id]),
            position: pos,
            cards: cards(entry.card, entry.cards),
            slingshot_failed: entry.slingshot_failed,
        };
        match out.iter_mut().find(|p| p.position == pos) {
            Some(existing) => {
                tracing::debug!(target: LOG_TARGET, seat = %pos, "duplicate trick entry");
                *existing = play;
            }
            None => out.push(play),
        }
    }
    out
}

fn opt_trick(entries: Option<Vec<WireTrickEntry>>) -> Option<Trick> {
    entries.map(trick)
}

/// Canonicalize a roster. Entries without an id or a seat are dropped; a
/// repeated id keeps the latest entry.
pub(crate) fn roster(players: Vec<WirePlayer>) -> Vec<RosterEntry> {
    let mut out: Vec<RosterEntry> = Vec::with_capacity(players.len());
    for p in players {
        let Some(id) = p.id.filter(|id| !id.trim().is_empty()) else {
            tracing::warn!(target: LOG_TARGET, "roster entry without id");
            continue;
        };
        let Some(pos) = opt_position(coalesce([p.position, p.seat])) else {
            continue;
        };
        let entry = RosterEntry {
            id,
            display_name: coalesce([p.name, p.display_name]),
            position: pos,
            hand_size: coalesce([p.cards_count, p.hand_size, p.hand_size_camel]),
        };
        match out.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => out.push(entry),
        }
    }
    out
}

pub(crate) fn ready(r: WireReady) -> ReadyPatch {
    ReadyPatch {
        ready_count: r.ready_count,
        total_players: r.total_players,
        ready_player_ids: coalesce([r.ready_player_ids, r.ready_players]),
        player_id: r.player_id,
    }
}

/// Negative countdowns are clamped to zero.
fn seconds(raw: Option<i64>) -> Option<u32> {
    raw.map(|s| u32::try_from(s.max(0)).unwrap_or(u32::MAX))
}

fn suit(raw: Option<String>) -> Option<Suit> {
    let raw = raw?;
    let parsed = Suit::parse(&raw);
    if parsed.is_none() {
        tracing::warn!(target: LOG_TARGET, suit = %raw, "unrecognized trump suit");
    }
    parsed
}

fn code(raw: Option<Value>) -> Option<String> {
    match raw? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn snapshot(s: WireSnapshot) -> SnapshotPatch {
    SnapshotPatch {
        room_id: s.room_id.filter(|r| !r.is_empty()),
        phase: s.phase.as_deref().and_then(phase),
        dealer_position: opt_position(s.dealer_position),
        dealer_player_id: s.dealer_player_id,
        dealer_has_bottom: s.dealer_has_bottom,
        bottom_pending: s.bottom_pending,
        bottom_cards_count: s.bottom_cards_count,
        bottom_cards: s.bottom_cards.map(tokens),
        trump_suit: suit(s.trump_suit),
        dealt_count: s.dealt_count,
        players: s.players.map(roster),
        idle_score: s.idle_score,
        team_scores: coalesce([s.scores.and_then(tally), s.team_scores.and_then(tally)]),
        tricks_won: s.tricks_won.and_then(tally),
        current_trick: opt_trick(s.current_trick),
        last_trick: opt_trick(s.last_trick),
        current_player: opt_position(coalesce([s.current_player, s.current_player_position])),
        countdown: CountdownPatch {
            seconds_remaining: seconds(coalesce([
                s.countdown,
                s.remaining_time,
                s.seconds_remaining,
            ])),
            active: s.countdown_active,
        },
        round_summary: s.round_summary.map(round_summary),
        ready_for_next_round: s.ready_for_next_round.map(ready),
        ready_to_start: s.ready_to_start.map(ready),
    }
}

fn play(p: WirePlay) -> PlayEvent {
    PlayEvent {
        current_trick: opt_trick(p.current_trick),
        last_trick: opt_trick(p.last_trick),
        trick_complete: p.trick_complete.unwrap_or(false),
        slingshot_failed: p.slingshot_failed.unwrap_or(false),
        current_player: opt_position(coalesce([p.current_player, p.current_player_position])),
        auto_play_kind: coalesce([p.auto_play_kind, p.auto_play_type]).filter(|k| !k.is_empty()),
        idle_score: p.idle_score,
        tricks_won: p.tricks_won.and_then(tally),
    }
}

/// Convert a decoded wire message into its canonical event.
pub(crate) fn event(message: WireMessage) -> TableEvent {
    match message {
        WireMessage::StateSnapshot(s) => TableEvent::Snapshot(snapshot(s)),
        WireMessage::DealTick(d) => {
            let seat = coalesce([d.player, d.position, d.seat, d.pos]);
            let position = seat.as_deref().and_then(Position::parse);
            if position.is_none() {
                tracing::warn!(target: LOG_TARGET, seat = ?seat, "deal tick for unknown seat");
            }
            TableEvent::CardDealt(CardDealt {
                position,
                raw_position: seat,
                card: d.card.map(CardToken::from).filter(|c| !c.is_empty()),
                dealt_count: d.dealt_count,
            })
        }
        WireMessage::PhaseChanged(p) => TableEvent::PhaseChanged {
            phase: p.phase.as_deref().and_then(phase),
            raw: p.phase,
        },
        WireMessage::ScoreUpdated(s) => {
            let (team_a, team_b) = match s.scores.and_then(tally) {
                Some(TeamTally { team_a, team_b }) => (Some(team_a), Some(team_b)),
                None => (s.ns, s.ew),
            };
            TableEvent::ScoreUpdated(ScorePatch {
                idle_score: s.idle_score,
                team_a,
                team_b,
            })
        }
        WireMessage::KoudiApplied(k) => TableEvent::KoudiApplied(k),
        WireMessage::PlayCard(p) => match opt_position(coalesce([p.player, p.position, p.seat])) {
            Some(position) => TableEvent::PlayCard(LastPlay {
                position,
                cards: cards(p.card, p.cards),
            }),
            None => TableEvent::Unknown {
                declared: Some("play_card".to_owned()),
            },
        },
        WireMessage::TrickWon(t) => TableEvent::TrickWon(TrickWon {
            winner: opt_position(t.winner),
            trick_points: t.trick_points,
            tricks_won: t.tricks_won.and_then(tally),
        }),
        WireMessage::BottomUpdated(b) => TableEvent::BottomUpdated(BottomPatch {
            dealer_has_bottom: b.dealer_has_bottom,
            bottom_pending: b.bottom_pending,
            bottom_cards_count: b.bottom_cards_count,
            bottom_cards: b.bottom_cards.map(tokens),
            dealer_player_id: b.dealer_player_id,
            dealer_position: opt_position(b.dealer_position),
        }),
        WireMessage::CardPlayed(p) => TableEvent::CardPlayed(play(p)),
        WireMessage::AutoPlay(p) => TableEvent::AutoPlay(play(p)),
        WireMessage::TrickComplete(t) => TableEvent::TrickComplete(TrickCompletion {
            last_trick: opt_trick(coalesce([t.last_trick, t.trick])),
            current_trick: opt_trick(t.current_trick),
            winner: opt_position(t.winner),
            tricks_won: t.tricks_won.and_then(tally),
            idle_score: t.idle_score,
            current_player: opt_position(coalesce([t.current_player, t.current_player_position])),
        }),
        WireMessage::RoundEnd(r) => TableEvent::RoundEnd(RoundEnd {
            round_summary: coalesce([r.round_summary, r.summary]).map(round_summary),
            ready: ReadyPatch {
                ready_count: r.ready_count,
                total_players: r.total_players,
                ready_player_ids: coalesce([r.ready_player_ids, r.ready_players]),
                player_id: None,
            },
        }),
        WireMessage::ReadyForNextRound(r) => TableEvent::ReadyForNextRound(ready(r)),
        WireMessage::ReadyToStart(r) => TableEvent::ReadyToStart(ready(r)),
        WireMessage::PlayersUpdated(p) => TableEvent::PlayersUpdated(PlayersUpdate {
            players: p.players.map(roster),
            ready_to_start: p.ready_to_start.map(ready),
        }),
        WireMessage::CountdownUpdated(c) => TableEvent::CountdownUpdated(CountdownPatch {
            seconds_remaining: seconds(coalesce([
                c.countdown,
                c.remaining_time,
                c.seconds_remaining,
            ])),
            active: coalesce([c.countdown_active, c.active]),
        }),
        WireMessage::Error(e) => TableEvent::ServerError(ServerError {
            message: e.message,
            code: code(e.code),
        }),
        WireMessage::Pong(_) => TableEvent::Pong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pos: &str, cards: &[&str]) -> WireTrickEntry {
        WireTrickEntry {
            position: Some(pos.to_owned()),
            cards: Some(CardsField::Many(cards.iter().map(|c| c.to_string()).collect())),
            ..Default::default()
        }
    }

    #[test]
    fn test_tokens_drop_blanks() {
        assert_eq!(tokens(["A♠", " ", "", " 2♥ "]).len(), 2);
    }

    #[test]
    fn test_singular_card_is_a_list() {
        assert_eq!(cards(Some("Q♦".into()), None), vec![CardToken::from("Q♦")]);
        assert!(cards(None, None).is_empty());
    }

    #[test]
    fn test_plural_wins_over_singular() {
        let got = cards(
            Some("Q♦".into()),
            Some(CardsField::Many(vec!["3♣".into(), "3♣".into()])),
        );
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_trick_drops_unknown_seats() {
        let got = trick(vec![entry("north", &["A♠"]), entry("centre", &["K♠"])]);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].position, Position::North);
    }

    #[test]
    fn test_trick_keeps_one_entry_per_seat() {
        let got = trick(vec![
            entry("NORTH", &["A♠"]),
            entry("EAST", &["3♠"]),
            entry("north", &["K♠"]),
        ]);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].position, Position::North);
        assert_eq!(got[0].cards, vec![CardToken::from("K♠")]);
        assert_eq!(got[1].position, Position::East);
    }

    #[test]
    fn test_trick_preserves_entry_flags() {
        let mut e = entry("west", &["5♥"]);
        e.slingshot_failed = Some(true);
        e.player_id = Some("p4".into());
        let got = trick(vec![e]);
        assert!(got[0].is_slingshot_failure());
        assert_eq!(got[0].player_id.as_deref(), Some("p4"));
    }

    #[test]
    fn test_roster_requires_id_and_seat() {
        let got = roster(vec![
            WirePlayer {
                id: Some("p1".into()),
                position: Some("north".into()),
                ..Default::default()
            },
            WirePlayer {
                id: None,
                position: Some("east".into()),
                ..Default::default()
            },
            WirePlayer {
                id: Some("p3".into()),
                position: Some("up".into()),
                ..Default::default()
            },
        ]);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "p1");
    }

    #[test]
    fn test_negative_countdown_clamps() {
        assert_eq!(seconds(Some(-3)), Some(0));
        assert_eq!(seconds(Some(30)), Some(30));
        assert_eq!(seconds(None), None);
    }

    #[test]
    fn test_unparseable_phase_keeps_raw() {
        let ev = event(WireMessage::PhaseChanged(crate::wire::WirePhase {
            phase: Some("intermission".into()),
        }));
        assert_eq!(
            ev,
            TableEvent::PhaseChanged {
                phase: None,
                raw: Some("intermission".into())
            }
        );
    }
}
