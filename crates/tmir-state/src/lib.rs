//! # tmir-state
//!
//! Client-side mirror of a four-seat trick-taking table.
//!
//! This crate provides:
//! - A validating decode step for inbound JSON frames
//! - A normalization boundary that resolves wire shape drift
//! - Canonical [`TableEvent`]s, one per message kind
//! - The [`Reconciler`], sole writer of the [`TableState`]
//! - The trick display hold as an explicit two-state machine
//!
//! ## Example
//!
//! ```rust
//! use tmir_state::{decode_frame, Reconciler};
//!
//! let mut reconciler = Reconciler::new();
//! let frame = r#"{"type":"card_played","current_trick":[{"pos":"NORTH","cards":["A♠"]}]}"#;
//! let decoded = decode_frame(frame).unwrap();
//! reconciler.apply(&decoded.event);
//! assert_eq!(reconciler.state().current_trick.len(), 1);
//! ```

pub mod continuity;
pub mod error;
pub mod event;
pub mod normalize;
pub mod reconciler;
pub mod table;
pub mod wire;

pub use continuity::{Admission, HoldTrigger, TrickHold, TrickSource};
pub use error::{DecodeError, Result};
pub use event::{
    BottomPatch, CardDealt, CountdownPatch, MessageKind, PlayEvent, PlayersUpdate, ReadyPatch,
    RosterEntry, RoundEnd, ScorePatch, ServerError, SnapshotPatch, TableEvent, TrickCompletion,
    TrickWon,
};
pub use reconciler::{Diagnostics, Reconciler};
pub use table::{
    Countdown, KoudiReport, LastPlay, PlayerSeat, ReadySet, RoundSummary, TableState, Trick,
    TrickPlay,
};
pub use wire::{decode_frame, decode_value, Decoded};
