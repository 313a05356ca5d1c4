//! Scenario tests driven by raw frames, decoded the same way the client does.

use tmir_core::{CardToken, Phase, Position, TeamTally};
use tmir_state::{decode_frame, Reconciler, TrickPlay};

fn feed(reconciler: &mut Reconciler, frames: &[&str]) {
    for frame in frames {
        let decoded = decode_frame(frame).expect("frame decodes");
        reconciler.apply(&decoded.event);
    }
}

fn seats(trick: &[TrickPlay]) -> Vec<Position> {
    trick.iter().map(|p| p.position).collect()
}

const FULL_TRICK: &str = r#"{"type":"trick_complete",
    "last_trick":[
        {"pos":"NORTH","cards":["A♠"]},
        {"pos":"EAST","cards":["3♠"]},
        {"pos":"SOUTH","cards":["K♠"]},
        {"pos":"WEST","cards":["5♠"]}],
    "current_trick":[
        {"pos":"NORTH","cards":["A♠"]},
        {"pos":"EAST","cards":["3♠"]},
        {"pos":"SOUTH","cards":["K♠"]},
        {"pos":"WEST","cards":["5♠"]}],
    "tricks_won":{"teamA":1,"teamB":0}}"#;

#[test]
fn end_to_end_trick_lifecycle() {
    let mut r = Reconciler::new();

    feed(
        &mut r,
        &[
            r#"{"type":"state_snapshot","phase":"bidding","current_trick":[],"current_player":"north"}"#,
        ],
    );
    assert_eq!(r.state().phase, Phase::Bidding);
    assert!(r.state().current_trick.is_empty());

    feed(
        &mut r,
        &[r#"{"type":"card_played","current_trick":[{"pos":"NORTH","cards":["A♠"]}]}"#],
    );
    assert_eq!(r.state().current_trick.len(), 1);
    assert_eq!(r.state().current_player_position, Some(Position::North));

    feed(
        &mut r,
        &[r#"{"type":"trick_complete",
            "last_trick":[
                {"pos":"NORTH","cards":["A♠"]},
                {"pos":"EAST","cards":["3♠"]},
                {"pos":"SOUTH","cards":["K♠"]},
                {"pos":"WEST","cards":["5♠"]}],
            "tricks_won":{"teamA":1,"teamB":0}}"#],
    );
    let s = r.state();
    assert_eq!(s.last_trick.len(), 4);
    assert_eq!(s.current_trick.len(), 1, "interim trick is retained");
    assert!(s.waiting_for_next_trick());
    assert_eq!(s.tricks_won, TeamTally::new(1, 0));

    feed(
        &mut r,
        &[r#"{"type":"card_played","current_trick":[{"pos":"EAST","cards":["2♠"]}]}"#],
    );
    let s = r.state();
    assert_eq!(seats(&s.current_trick), vec![Position::East]);
    assert_eq!(s.current_trick[0].cards, vec![CardToken::from("2♠")]);
    assert!(!s.waiting_for_next_trick());
}

#[test]
fn completed_trick_survives_empty_snapshot() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"phase_changed","phase":"playing"}"#,
            FULL_TRICK,
            r#"{"type":"state_snapshot","phase":"playing","current_trick":[]}"#,
        ],
    );
    let s = r.state();
    assert_eq!(
        seats(&s.current_trick),
        vec![Position::North, Position::East, Position::South, Position::West]
    );
    assert!(s.waiting_for_next_trick());
    assert_eq!(r.diagnostics().ignored_tricks, 1);
}

#[test]
fn completed_trick_survives_empty_play_delta() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            FULL_TRICK,
            r#"{"type":"card_played","current_trick":[],"current_player":"east"}"#,
        ],
    );
    assert_eq!(r.state().current_trick.len(), 4);
    assert_eq!(r.state().current_player_position, Some(Position::East));
}

#[test]
fn lead_after_completion_replaces_trick() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            FULL_TRICK,
            r#"{"type":"card_played","current_trick":[{"player":"west","card":"9♣"}]}"#,
        ],
    );
    let s = r.state();
    assert_eq!(s.current_trick.len(), 1);
    assert_eq!(s.current_trick[0].position, Position::West);
    assert!(!s.waiting_for_next_trick());
}

#[test]
fn failed_slingshot_does_not_start_a_trick() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            FULL_TRICK,
            r#"{"type":"card_played","slingshot_failed":true,
                "current_trick":[{"pos":"NORTH","cards":["2♥"]}]}"#,
        ],
    );
    let s = r.state();
    assert!(s.waiting_for_next_trick());
    assert_eq!(s.current_trick.len(), 4);

    feed(
        &mut r,
        &[r#"{"type":"auto_play","auto_play_kind":"timeout",
              "current_trick":[{"pos":"NORTH","cards":["2♥"],"slingshot_failed":true}]}"#],
    );
    let s = r.state();
    assert!(s.waiting_for_next_trick());
    assert_eq!(s.current_trick.len(), 4);
    assert_eq!(s.auto_play_kind.as_deref(), Some("timeout"));
}

#[test]
fn play_with_completion_flag_holds() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"card_played","trick_complete":true,
                "current_trick":[
                    {"pos":"NORTH","cards":["A♠"]},
                    {"pos":"EAST","cards":["3♠"]},
                    {"pos":"SOUTH","cards":["K♠"]},
                    {"pos":"WEST","cards":["5♠"]}],
                "last_trick":[
                    {"pos":"NORTH","cards":["A♠"]},
                    {"pos":"EAST","cards":["3♠"]},
                    {"pos":"SOUTH","cards":["K♠"]},
                    {"pos":"WEST","cards":["5♠"]}]}"#,
            r#"{"type":"card_played","current_trick":[]}"#,
        ],
    );
    assert!(r.state().waiting_for_next_trick());
    assert_eq!(r.state().current_trick.len(), 4);
    assert_eq!(r.state().last_trick.len(), 4);
}

#[test]
fn new_deal_releases_the_hold() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"phase_changed","phase":"playing"}"#,
            FULL_TRICK,
            r#"{"type":"phase_changed","phase":"dealing"}"#,
        ],
    );
    let s = r.state();
    assert!(!s.waiting_for_next_trick());
    assert!(s.current_trick.is_empty());
    assert!(s.last_trick.is_empty());
    assert_eq!(s.tricks_won.total(), 0);
}

#[test]
fn dealing_round_builds_demo_hands() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"state_snapshot","room_id":"r-42","phase":"waiting",
                "players":[
                    {"id":"p1","name":"Ann","position":"NORTH","cards_count":0},
                    {"id":"p2","name":"Bo","position":"EAST","cards_count":0},
                    {"id":"p3","name":"Cy","position":"SOUTH","cards_count":0},
                    {"id":"p4","name":"Di","position":"WEST","cards_count":0}]}"#,
            r#"{"type":"phase_changed","phase":"dealing"}"#,
            r#"{"type":"deal_tick","player":"north","card":"10♥","dealt_count":1}"#,
            r#"{"type":"deal_tick","player":"east","card":null,"dealt_count":2}"#,
            r#"{"type":"deal_tick","player":"north","card":"JOKER-A/大王"}"#,
            r#"{"type":"deal_tick","player":"nowhere","card":"2♣"}"#,
        ],
    );
    let s = r.state();
    assert_eq!(s.room_id.as_deref(), Some("r-42"));
    assert_eq!(s.phase, Phase::Dealing);
    assert_eq!(
        s.demo_hand(Position::North),
        &[CardToken::from("10♥"), CardToken::from("JOKER-A/大王")]
    );
    assert!(s.demo_hand(Position::East).is_empty());
    assert_eq!(s.player("p1").map(|p| p.hand_size), Some(2));
    assert_eq!(s.player("p2").map(|p| p.hand_size), Some(1));
    assert_eq!(s.dealt_count, 4);
    assert_eq!(r.diagnostics().unmapped_deals, 1);
    assert!(s.demo_hand(Position::North)[1].card().is_some_and(|c| c.is_joker()));
}

#[test]
fn sparse_snapshot_keeps_omitted_fields() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"state_snapshot","phase":"playing","trump_suit":"♥","idle_score":40,
                "dealer_position":"south","bottom_cards_count":8}"#,
            r#"{"type":"state_snapshot","idle_score":55}"#,
        ],
    );
    let s = r.state();
    assert_eq!(s.phase, Phase::Playing);
    assert_eq!(s.idle_score, 55);
    assert_eq!(s.trump_suit, Some(tmir_core::Suit::Hearts));
    assert_eq!(s.dealer_position, Some(Position::South));
    assert_eq!(s.bottom_cards_count, 8);
}

#[test]
fn scores_merge_from_either_shape() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[r#"{"type":"score_updated","scores":{"north_south":20,"east_west":35}}"#],
    );
    assert_eq!(r.state().team_scores, TeamTally::new(20, 35));
    feed(&mut r, &[r#"{"type":"score_updated","ew":50,"idle_score":50}"#]);
    assert_eq!(r.state().team_scores, TeamTally::new(20, 50));
    assert_eq!(r.state().idle_score, 50);
}

#[test]
fn ready_sets_follow_membership() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"round_end","round_summary":{"winner_side":"east_west","total_score":95},
                "ready_count":0,"total_players":4}"#,
            r#"{"type":"ready_for_next_round","player_id":"p1"}"#,
            r#"{"type":"ready_for_next_round","player_id":"p1"}"#,
            r#"{"type":"ready_for_next_round","player_id":"p3","ready_count":2}"#,
        ],
    );
    let s = r.state();
    assert_eq!(s.ready_for_next_round.ready_count, 2);
    assert!(s.ready_for_next_round.contains("p1"));
    assert!(s.ready_for_next_round.contains("p3"));
    assert_eq!(
        s.round_summary.as_ref().and_then(|rs| rs.idle_score),
        Some(95)
    );

    feed(
        &mut r,
        &[r#"{"type":"ready_for_next_round","ready_player_ids":["p2"],"ready_count":1}"#],
    );
    let s = r.state();
    assert_eq!(s.ready_for_next_round.ready_player_ids.len(), 1);
    assert!(s.ready_for_next_round.contains("p2"));
}

#[test]
fn koudi_play_card_and_countdown_are_recorded() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"koudi_applied","bottom_score":20,"multiplier":4,"bonus":80}"#,
            r#"{"type":"play_card","player":"SOUTH","cards":["Q♠","Q♠"]}"#,
            r#"{"type":"countdown_updated","remaining_time":15,"countdown_active":true}"#,
            r#"{"type":"countdown_updated","remaining_time":14}"#,
        ],
    );
    let s = r.state();
    assert_eq!(s.koudi.and_then(|k| k.bonus), Some(80));
    assert_eq!(s.last_play.as_ref().map(|p| p.position), Some(Position::South));
    assert_eq!(s.last_play.as_ref().map(|p| p.cards.len()), Some(2));
    assert_eq!(s.countdown.seconds_remaining, 14);
    assert!(s.countdown.active);
    // Neither event touches the trick.
    assert!(s.current_trick.is_empty());
}

#[test]
fn frames_with_two_spellings_still_apply() {
    let mut r = Reconciler::new();
    feed(
        &mut r,
        &[
            r#"{"type":"state_snapshot","phase":"playing",
                "current_player":"north","current_player_position":"north"}"#,
            r#"{"type":"countdown_updated","remaining_time":12,"countdown":12}"#,
            r#"{"type":"trick_won","winner":"east","tricks_won":{"teamA":2,"team_a":2,"teamB":3}}"#,
        ],
    );
    let s = r.state();
    assert_eq!(s.phase, Phase::Playing);
    assert_eq!(s.current_player_position, Some(Position::North));
    assert_eq!(s.countdown.seconds_remaining, 12);
    assert_eq!(s.tricks_won, TeamTally::new(2, 3));
}

#[test]
fn error_pong_and_unknown_leave_state_alone() {
    let mut r = Reconciler::new();
    feed(&mut r, &[r#"{"type":"state_snapshot","phase":"bidding","idle_score":10}"#]);
    let before = r.state().clone();
    feed(
        &mut r,
        &[
            r#"{"type":"error","message":"Not your turn"}"#,
            r#"{"type":"pong"}"#,
            r#"{"type":"emote","emoji":"🙂"}"#,
        ],
    );
    assert_eq!(r.state(), &before);
    assert_eq!(r.diagnostics().server_errors, 1);
    assert_eq!(r.diagnostics().unknown_messages, 1);
}
