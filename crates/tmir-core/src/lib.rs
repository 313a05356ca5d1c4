pub mod card;
pub mod phase;
pub mod seat;

pub use card::{Card, CardToken, Rank, Suit};
pub use phase::Phase;
pub use seat::{Position, Team, TeamTally};
