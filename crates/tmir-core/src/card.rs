//! Card tokens as they travel on the wire.
//!
//! A token is either a rank followed by a suit glyph (`"2♠"`, `"10♥"`, `"A♣"`)
//! or one of the two jokers. Joker tokens may carry a decorative suffix, e.g.
//! `"JOKER-A/大王"`, which is ignored when parsing.
//!
//! Parsing never fails loudly: anything that is not a recognizable card yields
//! `None`, so callers can treat unknown tokens as "no card" instead of an error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker carried by the big joker token.
pub const BIG_JOKER: &str = "JOKER-A";
/// Marker carried by the small joker token.
pub const SMALL_JOKER: &str = "JOKER-B";

/// The four suits, identified on the wire by their glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♣")]
    Clubs,
    #[serde(rename = "♦")]
    Diamonds,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Clubs, Suit::Diamonds];

    pub fn glyph(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '♠' => Some(Suit::Spades),
            '♥' => Some(Suit::Hearts),
            '♣' => Some(Suit::Clubs),
            '♦' => Some(Suit::Diamonds),
            _ => None,
        }
    }

    /// Accepts a glyph or an English suit name in any case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_glyph(c);
        }
        match s.to_ascii_lowercase().as_str() {
            "spades" | "spade" => Some(Suit::Spades),
            "hearts" | "heart" => Some(Suit::Hearts),
            "clubs" | "club" => Some(Suit::Clubs),
            "diamonds" | "diamond" => Some(Suit::Diamonds),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Card ranks, including the two jokers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
    SmallJoker,
    BigJoker,
}

impl Rank {
    /// Plain ranks in ascending order (jokers excluded).
    pub const PLAIN: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::SmallJoker => SMALL_JOKER,
            Rank::BigJoker => BIG_JOKER,
        }
    }

    /// Parse a plain rank token (`"2"`..`"10"`, `"J"`, `"Q"`, `"K"`, `"A"`).
    pub fn from_plain(token: &str) -> Option<Self> {
        Self::PLAIN.iter().copied().find(|r| r.as_str() == token)
    }

    pub fn is_joker(self) -> bool {
        matches!(self, Rank::SmallJoker | Rank::BigJoker)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed card. Jokers have no suit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Option<Suit>,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self {
            rank,
            suit: Some(suit),
        }
    }

    pub fn big_joker() -> Self {
        Self {
            rank: Rank::BigJoker,
            suit: None,
        }
    }

    pub fn small_joker() -> Self {
        Self {
            rank: Rank::SmallJoker,
            suit: None,
        }
    }

    /// Parse a wire token, returning `None` for anything unrecognized.
    ///
    /// The big joker marker is checked first, so a token mentioning both
    /// markers resolves to the big joker.
    pub fn parse(token: &str) -> Option<Self> {
        if token.contains(BIG_JOKER) {
            return Some(Self::big_joker());
        }
        if token.contains(SMALL_JOKER) {
            return Some(Self::small_joker());
        }

        let token = token.trim();
        let suit_char = token.chars().last()?;
        let suit = Suit::from_glyph(suit_char)?;
        let rank_str = &token[..token.len() - suit_char.len_utf8()];
        let rank = Rank::from_plain(rank_str)?;
        Some(Self::new(rank, suit))
    }

    pub fn is_joker(&self) -> bool {
        self.rank.is_joker()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suit {
            Some(suit) => write!(f, "{}{}", self.rank, suit),
            None => write!(f, "{}", self.rank),
        }
    }
}

/// A card exactly as the server spelled it.
///
/// Tokens are kept verbatim (minus surrounding whitespace) so the display
/// layer can render server-specific decorations; [`CardToken::card`] gives
/// the structured view.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardToken(String);

impl CardToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.len() == token.len() {
            Self(token)
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn card(&self) -> Option<Card> {
        Card::parse(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CardToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CardToken {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Card> for CardToken {
    fn from(card: Card) -> Self {
        Self(card.to_string())
    }
}

impl fmt::Display for CardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ten_of_hearts() {
        let card = Card::parse("10♥").unwrap();
        assert_eq!(card.rank, Rank::Ten);
        assert_eq!(card.suit, Some(Suit::Hearts));
    }

    #[test]
    fn test_parse_face_cards() {
        assert_eq!(Card::parse("A♠"), Some(Card::new(Rank::Ace, Suit::Spades)));
        assert_eq!(Card::parse("J♣"), Some(Card::new(Rank::Jack, Suit::Clubs)));
        assert_eq!(Card::parse("2♦"), Some(Card::new(Rank::Two, Suit::Diamonds)));
    }

    #[test]
    fn test_big_joker_ignores_suffix() {
        assert_eq!(Card::parse("JOKER-A/大王"), Some(Card::big_joker()));
        assert_eq!(Card::parse("JOKER-A♠"), Some(Card::big_joker()));
        assert_eq!(Card::parse("JOKER-B/小王"), Some(Card::small_joker()));
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert_eq!(Card::parse("X♠"), None);
        assert_eq!(Card::parse("11♥"), None);
        assert_eq!(Card::parse("A"), None);
        assert_eq!(Card::parse("♠"), None);
        assert_eq!(Card::parse(""), None);
        assert_eq!(Card::parse("AS"), None);
    }

    #[test]
    fn test_display_matches_wire_form() {
        assert_eq!(Card::new(Rank::Ten, Suit::Hearts).to_string(), "10♥");
        assert_eq!(Card::big_joker().to_string(), "JOKER-A");
    }

    #[test]
    fn test_suit_parse_names_and_glyphs() {
        assert_eq!(Suit::parse("♦"), Some(Suit::Diamonds));
        assert_eq!(Suit::parse("Hearts"), Some(Suit::Hearts));
        assert_eq!(Suit::parse("SPADES"), Some(Suit::Spades));
        assert_eq!(Suit::parse("NT"), None);
    }

    #[test]
    fn test_card_token_trims_and_serializes_transparently() {
        let token = CardToken::new("  K♣ ");
        assert_eq!(token.as_str(), "K♣");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"K♣\"");
        assert_eq!(token.card(), Some(Card::new(Rank::King, Suit::Clubs)));
    }
}
