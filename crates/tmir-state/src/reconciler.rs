//! Folds canonical events into a [`TableState`].
//!
//! Every merge is a sparse patch: a field that an event does not carry is left
//! untouched. Merges are idempotent under re-delivery except for the two
//! increment kinds, dealt cards and a bare trick winner, which assume
//! at-most-once delivery.

use crate::continuity::{Admission, HoldTrigger, TrickSource};
use crate::event::{
    BottomPatch, CardDealt, CountdownPatch, PlayEvent, PlayersUpdate, RosterEntry, SnapshotPatch,
    TableEvent, TrickCompletion, TrickWon,
};
use crate::table::{PlayerSeat, TableState, Trick};
use serde::Serialize;
use tmir_core::{Phase, TeamTally};

const LOG_TARGET: &str = "tmir_state::reconciler";

/// Counters for input the reconciler could not use.
///
/// Kept beside the table rather than in it, so they never take part in state
/// comparisons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub events_applied: u64,
    /// Dealt cards addressed to a seat that did not parse.
    pub unmapped_deals: u64,
    /// Phase changes whose phase did not parse.
    pub unparsed_phases: u64,
    /// Incoming tricks suppressed by the display hold.
    pub ignored_tricks: u64,
    /// Ready-to-start counters dropped because the game had started.
    pub dropped_ready_updates: u64,
    pub server_errors: u64,
    pub unknown_messages: u64,
}

/// Sole writer of a [`TableState`].
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    state: TableState,
    diagnostics: Diagnostics,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing view, e.g. one restored for a replay.
    pub fn with_state(state: TableState) -> Self {
        Self {
            state,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_state(self) -> TableState {
        self.state
    }

    /// Apply one event. Never fails; unusable input leaves the state as it was.
    pub fn apply(&mut self, event: &TableEvent) {
        self.diagnostics.events_applied += 1;
        tracing::trace!(target: LOG_TARGET, kind = %event.kind(), "apply");

        match event {
            TableEvent::Snapshot(snap) => self.apply_snapshot(snap),
            TableEvent::CardDealt(dealt) => self.apply_card_dealt(dealt),
            TableEvent::PhaseChanged { phase, raw } => match phase {
                Some(phase) => self.enter_phase(*phase),
                None if raw.is_some() => self.diagnostics.unparsed_phases += 1,
                None => {}
            },
            TableEvent::ScoreUpdated(score) => {
                set(&mut self.state.idle_score, score.idle_score);
                set(&mut self.state.team_scores.team_a, score.team_a);
                set(&mut self.state.team_scores.team_b, score.team_b);
            }
            TableEvent::KoudiApplied(report) => self.state.koudi = Some(*report),
            TableEvent::PlayCard(play) => self.state.last_play = Some(play.clone()),
            TableEvent::TrickWon(won) => self.apply_trick_won(won),
            TableEvent::BottomUpdated(bottom) => self.apply_bottom(bottom),
            TableEvent::CardPlayed(play) => {
                self.apply_play(play);
                if play.auto_play_kind.is_some() {
                    self.state.auto_play_kind = play.auto_play_kind.clone();
                }
            }
            TableEvent::AutoPlay(play) => {
                self.apply_play(play);
                self.state.auto_play_kind = play.auto_play_kind.clone();
            }
            TableEvent::TrickComplete(done) => self.apply_trick_complete(done),
            TableEvent::RoundEnd(end) => {
                if let Some(summary) = &end.round_summary {
                    self.state.round_summary = Some(summary.clone());
                }
                if !end.ready.is_empty() {
                    self.state.ready_for_next_round.merge(&end.ready);
                }
            }
            TableEvent::ReadyForNextRound(ready) => self.state.ready_for_next_round.merge(ready),
            TableEvent::ReadyToStart(ready) => self.state.ready_to_start.merge(ready),
            TableEvent::PlayersUpdated(update) => self.apply_players(update),
            TableEvent::CountdownUpdated(countdown) => self.apply_countdown(countdown),
            TableEvent::ServerError(err) => {
                self.diagnostics.server_errors += 1;
                tracing::debug!(
                    target: LOG_TARGET,
                    server_message = ?err.message,
                    code = ?err.code,
                    "server error"
                );
            }
            TableEvent::Pong => {}
            TableEvent::Unknown { declared } => {
                self.diagnostics.unknown_messages += 1;
                tracing::debug!(
                    target: LOG_TARGET,
                    declared = ?declared,
                    "ignoring unknown message"
                );
            }
        }
    }

    fn enter_phase(&mut self, phase: Phase) {
        if phase == Phase::Dealing && self.state.phase != Phase::Dealing {
            self.start_new_deal();
        }
        if phase != self.state.phase {
            tracing::debug!(target: LOG_TARGET, from = %self.state.phase, to = %phase, "phase");
        }
        self.state.phase = phase;
        if phase.precedes_first_trick() {
            self.hold(HoldTrigger::NewDealStarted);
        }
    }

    fn start_new_deal(&mut self) {
        let state = &mut self.state;
        state.demo_hands.clear();
        state.dealt_count = 0;
        state.tricks_won = TeamTally::default();
        state.current_trick.clear();
        state.last_trick.clear();
        state.last_trick_winner = None;
        state.round_summary = None;
        state.ready_for_next_round = Default::default();
        state.koudi = None;
        state.last_play = None;
        state.bottom_cards.clear();
        for player in &mut state.players {
            player.hand_size = 0;
        }
    }

    fn hold(&mut self, trigger: HoldTrigger) {
        self.state.trick_hold = self.state.trick_hold.on(trigger);
    }

    fn admit_trick(&mut self, source: TrickSource, incoming: &Trick, slingshot_failed: bool) {
        match self.state.trick_hold.admit(source, incoming, slingshot_failed) {
            Admission::StartNewTrick => {
                self.state.current_trick = incoming.clone();
                self.hold(HoldTrigger::LeadObserved);
            }
            Admission::Replace => self.state.current_trick = incoming.clone(),
            Admission::Ignore => {
                self.diagnostics.ignored_tricks += 1;
                tracing::debug!(
                    target: LOG_TARGET,
                    entries = incoming.len(),
                    "holding completed trick"
                );
            }
        }
    }

    fn roster(&self, entries: &[RosterEntry]) -> Vec<PlayerSeat> {
        entries
            .iter()
            .map(|e| e.clone().into_seat(self.state.player(&e.id)))
            .collect()
    }

    fn apply_snapshot(&mut self, snap: &SnapshotPatch) {
        if let Some(phase) = snap.phase {
            self.enter_phase(phase);
        }

        if let Some(players) = &snap.players {
            self.state.players = self.roster(players);
        }

        let state = &mut self.state;
        set_clone(&mut state.room_id, &snap.room_id);
        set_some(&mut state.dealer_position, snap.dealer_position);
        set_clone(&mut state.dealer_player_id, &snap.dealer_player_id);
        set(&mut state.dealer_has_bottom, snap.dealer_has_bottom);
        set(&mut state.bottom_pending, snap.bottom_pending);
        set(&mut state.bottom_cards_count, snap.bottom_cards_count);
        if let Some(cards) = &snap.bottom_cards {
            state.bottom_cards = cards.clone();
        }
        set_some(&mut state.trump_suit, snap.trump_suit);
        set(&mut state.dealt_count, snap.dealt_count);
        set(&mut state.idle_score, snap.idle_score);
        set(&mut state.team_scores, snap.team_scores);
        set(&mut state.tricks_won, snap.tricks_won);
        if let Some(last) = &snap.last_trick {
            state.last_trick = last.clone();
        }
        set_some(&mut state.current_player_position, snap.current_player);
        set(&mut state.countdown.seconds_remaining, snap.countdown.seconds_remaining);
        set(&mut state.countdown.active, snap.countdown.active);
        if let Some(summary) = &snap.round_summary {
            state.round_summary = Some(summary.clone());
        }
        if let Some(ready) = &snap.ready_for_next_round {
            state.ready_for_next_round.merge(ready);
        }
        if let Some(ready) = &snap.ready_to_start {
            state.ready_to_start.merge(ready);
        }

        if let Some(trick) = &snap.current_trick {
            self.admit_trick(TrickSource::Snapshot, trick, false);
        }
    }

    fn apply_card_dealt(&mut self, dealt: &CardDealt) {
        let state = &mut self.state;
        match dealt.position {
            Some(pos) => {
                if let Some(card) = &dealt.card {
                    state.demo_hands.entry(pos).or_default().push(card.clone());
                }
                if let Some(player) = state.players.iter_mut().find(|p| p.position == pos) {
                    player.hand_size = player.hand_size.saturating_add(1);
                }
            }
            None => {
                self.diagnostics.unmapped_deals += 1;
                tracing::warn!(
                    target: LOG_TARGET,
                    seat = ?dealt.raw_position,
                    "dealt card for unmapped seat"
                );
            }
        }
        let next = match dealt.dealt_count {
            Some(count) => count,
            None => state.dealt_count.saturating_add(1),
        };
        state.dealt_count = next;
    }

    fn apply_trick_won(&mut self, won: &TrickWon) {
        match (&won.tricks_won, won.winner) {
            (Some(tally), _) => self.set_tricks_won(*tally),
            (None, Some(winner)) => {
                let slot = self.state.tricks_won.get_mut(winner.team());
                *slot = slot.saturating_add(1);
            }
            (None, None) => {}
        }
        set_some(&mut self.state.last_trick_winner, won.winner);
    }

    fn set_tricks_won(&mut self, tally: TeamTally<u32>) {
        if tally.total() < self.state.tricks_won.total() {
            tracing::debug!(
                target: LOG_TARGET,
                previous = self.state.tricks_won.total(),
                reported = tally.total(),
                "trick tally went backwards"
            );
        }
        self.state.tricks_won = tally;
    }

    fn apply_bottom(&mut self, bottom: &BottomPatch) {
        let state = &mut self.state;
        set(&mut state.dealer_has_bottom, bottom.dealer_has_bottom);
        set(&mut state.bottom_pending, bottom.bottom_pending);
        set(&mut state.bottom_cards_count, bottom.bottom_cards_count);
        if let Some(cards) = &bottom.bottom_cards {
            state.bottom_cards = cards.clone();
        }
        set_clone(&mut state.dealer_player_id, &bottom.dealer_player_id);
        set_some(&mut state.dealer_position, bottom.dealer_position);
    }

    /// Shared by `card_played` and `auto_play`.
    fn apply_play(&mut self, play: &PlayEvent) {
        let source = if play.trick_complete {
            self.hold(HoldTrigger::TrickCompleted);
            TrickSource::Completion
        } else {
            TrickSource::Play
        };
        if let Some(trick) = &play.current_trick {
            self.admit_trick(source, trick, play.slingshot_failed);
        }
        if let Some(last) = &play.last_trick {
            self.state.last_trick = last.clone();
        }
        if let Some(tally) = play.tricks_won {
            self.set_tricks_won(tally);
        }
        set_some(&mut self.state.current_player_position, play.current_player);
        set(&mut self.state.idle_score, play.idle_score);
    }

    fn apply_trick_complete(&mut self, done: &TrickCompletion) {
        self.hold(HoldTrigger::TrickCompleted);
        if let Some(last) = &done.last_trick {
            self.state.last_trick = last.clone();
        }
        if let Some(current) = &done.current_trick {
            self.admit_trick(TrickSource::Completion, current, false);
        }
        if let Some(tally) = done.tricks_won {
            self.set_tricks_won(tally);
        }
        set_some(&mut self.state.last_trick_winner, done.winner);
        set(&mut self.state.idle_score, done.idle_score);
        set_some(&mut self.state.current_player_position, done.current_player);
    }

    fn apply_players(&mut self, update: &PlayersUpdate) {
        if let Some(players) = &update.players {
            self.state.players = self.roster(players);
        }
        if let Some(ready) = &update.ready_to_start {
            if self.state.phase == Phase::Waiting {
                self.state.ready_to_start.merge(ready);
            } else {
                self.diagnostics.dropped_ready_updates += 1;
                tracing::debug!(
                    target: LOG_TARGET,
                    phase = %self.state.phase,
                    "dropping ready-to-start counters outside the waiting room"
                );
            }
        }
    }

    fn apply_countdown(&mut self, countdown: &CountdownPatch) {
        set(&mut self.state.countdown.seconds_remaining, countdown.seconds_remaining);
        set(&mut self.state.countdown.active, countdown.active);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn set_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn set_clone<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ReadyPatch;
    use crate::table::TrickPlay;
    use tmir_core::{CardToken, Position};

    fn seat(id: &str, pos: Position, hand: Option<u32>) -> RosterEntry {
        RosterEntry {
            id: id.into(),
            display_name: None,
            position: pos,
            hand_size: hand,
        }
    }

    #[test]
    fn test_deal_appends_and_counts() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::PlayersUpdated(PlayersUpdate {
            players: Some(vec![seat("p1", Position::North, Some(0))]),
            ready_to_start: None,
        }));
        r.apply(&TableEvent::CardDealt(CardDealt {
            position: Some(Position::North),
            raw_position: Some("north".into()),
            card: Some(CardToken::from("10♥")),
            dealt_count: None,
        }));
        r.apply(&TableEvent::CardDealt(CardDealt {
            position: Some(Position::East),
            raw_position: Some("east".into()),
            card: None,
            dealt_count: Some(7),
        }));

        let s = r.state();
        assert_eq!(s.demo_hand(Position::North), &[CardToken::from("10♥")]);
        assert!(s.demo_hand(Position::East).is_empty());
        assert_eq!(s.player("p1").map(|p| p.hand_size), Some(1));
        assert_eq!(s.dealt_count, 7);
    }

    #[test]
    fn test_unmapped_deal_is_counted() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::CardDealt(CardDealt {
            raw_position: Some("centre".into()),
            card: Some(CardToken::from("2♣")),
            ..Default::default()
        }));
        assert_eq!(r.diagnostics().unmapped_deals, 1);
        assert!(r.state().demo_hands.is_empty());
        assert_eq!(r.state().dealt_count, 1);
    }

    #[test]
    fn test_roster_keeps_known_hand_size() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::PlayersUpdated(PlayersUpdate {
            players: Some(vec![seat("p1", Position::North, Some(12))]),
            ready_to_start: None,
        }));
        r.apply(&TableEvent::PlayersUpdated(PlayersUpdate {
            players: Some(vec![
                seat("p1", Position::North, None),
                seat("p2", Position::East, None),
            ]),
            ready_to_start: None,
        }));
        assert_eq!(r.state().player("p1").map(|p| p.hand_size), Some(12));
        assert_eq!(r.state().player("p2").map(|p| p.hand_size), Some(0));
    }

    #[test]
    fn test_ready_to_start_only_in_waiting_room() {
        let mut r = Reconciler::new();
        let ready = ReadyPatch {
            ready_count: Some(2),
            total_players: Some(4),
            ..Default::default()
        };
        r.apply(&TableEvent::PlayersUpdated(PlayersUpdate {
            players: None,
            ready_to_start: Some(ready.clone()),
        }));
        assert_eq!(r.state().ready_to_start.ready_count, 2);

        r.apply(&TableEvent::PhaseChanged {
            phase: Some(Phase::Playing),
            raw: Some("playing".into()),
        });
        r.apply(&TableEvent::PlayersUpdated(PlayersUpdate {
            players: None,
            ready_to_start: Some(ReadyPatch {
                ready_count: Some(0),
                ..ready
            }),
        }));
        assert_eq!(r.state().ready_to_start.ready_count, 2);
        assert_eq!(r.diagnostics().dropped_ready_updates, 1);
    }

    #[test]
    fn test_entering_dealing_starts_a_new_deal() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::PhaseChanged {
            phase: Some(Phase::Playing),
            raw: None,
        });
        r.apply(&TableEvent::TrickWon(TrickWon {
            winner: Some(Position::East),
            ..Default::default()
        }));
        r.apply(&TableEvent::CardPlayed(PlayEvent {
            current_trick: Some(vec![TrickPlay::new(
                Position::North,
                vec![CardToken::from("A♠")],
            )]),
            ..Default::default()
        }));
        assert_eq!(r.state().tricks_won.team_b, 1);

        r.apply(&TableEvent::PhaseChanged {
            phase: Some(Phase::Dealing),
            raw: None,
        });
        let s = r.state();
        assert_eq!(s.tricks_won.total(), 0);
        assert!(s.current_trick.is_empty());
        assert_eq!(s.last_trick_winner, None);
        assert!(!s.waiting_for_next_trick());
    }

    #[test]
    fn test_unparsed_phase_leaves_phase() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::PhaseChanged {
            phase: Some(Phase::Bidding),
            raw: None,
        });
        r.apply(&TableEvent::PhaseChanged {
            phase: None,
            raw: Some("intermission".into()),
        });
        assert_eq!(r.state().phase, Phase::Bidding);
        assert_eq!(r.diagnostics().unparsed_phases, 1);
    }

    #[test]
    fn test_trick_won_tally_overwrites_and_winner_increments() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::TrickWon(TrickWon {
            winner: Some(Position::South),
            ..Default::default()
        }));
        assert_eq!(r.state().tricks_won, TeamTally::new(1, 0));
        r.apply(&TableEvent::TrickWon(TrickWon {
            winner: Some(Position::West),
            tricks_won: Some(TeamTally::new(3, 2)),
            trick_points: Some(10),
        }));
        assert_eq!(r.state().tricks_won, TeamTally::new(3, 2));
        assert_eq!(r.state().last_trick_winner, Some(Position::West));
    }

    #[test]
    fn test_bottom_count_only_moves_when_reported() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::BottomUpdated(BottomPatch {
            bottom_cards_count: Some(0),
            ..Default::default()
        }));
        let revealed: Vec<CardToken> = ["3♦", "4♦", "5♦", "6♦", "7♦", "8♦", "9♦", "10♦"]
            .into_iter()
            .map(CardToken::from)
            .collect();
        r.apply(&TableEvent::BottomUpdated(BottomPatch {
            bottom_cards: Some(revealed.clone()),
            ..Default::default()
        }));
        assert_eq!(r.state().bottom_cards, revealed);
        assert_eq!(r.state().bottom_cards_count, 0);

        r.apply(&TableEvent::Snapshot(SnapshotPatch {
            bottom_cards: Some(vec![CardToken::from("A♦")]),
            ..Default::default()
        }));
        assert_eq!(r.state().bottom_cards_count, 0);

        r.apply(&TableEvent::BottomUpdated(BottomPatch {
            bottom_cards_count: Some(8),
            ..Default::default()
        }));
        assert_eq!(r.state().bottom_cards_count, 8);
        assert_eq!(r.state().bottom_cards, vec![CardToken::from("A♦")]);
    }

    #[test]
    fn test_auto_play_clears_kind_card_played_does_not() {
        let mut r = Reconciler::new();
        r.apply(&TableEvent::AutoPlay(PlayEvent {
            auto_play_kind: Some("timeout".into()),
            ..Default::default()
        }));
        r.apply(&TableEvent::CardPlayed(PlayEvent::default()));
        assert_eq!(r.state().auto_play_kind.as_deref(), Some("timeout"));
        r.apply(&TableEvent::AutoPlay(PlayEvent::default()));
        assert_eq!(r.state().auto_play_kind, None);
    }
}
