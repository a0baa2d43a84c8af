use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, PlayerState};

/// Points each player starts from.
pub const STARTING_SCORE: i32 = 501;

/// Darts a player throws per turn.
pub const DARTS_PER_TURN: u8 = 3;

/// Seconds a player has to complete a turn.
pub const TURN_TIME_SECONDS: u32 = 30;

/// Score value of both bull zones.
pub const BULL_SCORE: u8 = 25;

/// Result text the server attaches to a winning throw.
pub const WINNER_RESULT: &str = "Winner!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitError {
    InvalidScore(u8),
    InvalidMultiplier(u8),
    TripleBull,
}

impl std::fmt::Display for HitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidScore(s) => write!(f, "invalid score: {s}"),
            Self::InvalidMultiplier(m) => write!(f, "invalid multiplier: {m}"),
            Self::TripleBull => write!(f, "no triple bullseye"),
        }
    }
}

impl std::error::Error for HitError {}

/// Ring multiplier. Encoded on the wire as the integer factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Multiplier {
    Single,
    Double,
    Triple,
}

impl Multiplier {
    pub fn factor(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }

    /// Compact prefix used in throw history ("", "D", "T").
    pub fn short_label(self) -> &'static str {
        match self {
            Self::Single => "",
            Self::Double => "D",
            Self::Triple => "T",
        }
    }

    /// Word prefix used in throw announcements ("", "Double ", "Triple ").
    pub fn long_label(self) -> &'static str {
        match self {
            Self::Single => "",
            Self::Double => "Double ",
            Self::Triple => "Triple ",
        }
    }
}

impl TryFrom<u8> for Multiplier {
    type Error = HitError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Single),
            2 => Ok(Self::Double),
            3 => Ok(Self::Triple),
            other => Err(HitError::InvalidMultiplier(other)),
        }
    }
}

impl From<Multiplier> for u8 {
    fn from(m: Multiplier) -> Self {
        m.factor()
    }
}

/// A scoring dart: a face number (or bull) and its ring multiplier.
///
/// Always valid: score is 1..=20 or 25, and a bull is never tripled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitResult {
    score: u8,
    multiplier: Multiplier,
}

impl HitResult {
    /// Inner bull, counted as a double.
    pub const DOUBLE_BULL: HitResult = HitResult {
        score: BULL_SCORE,
        multiplier: Multiplier::Double,
    };

    /// Outer bull ring.
    pub const SINGLE_BULL: HitResult = HitResult {
        score: BULL_SCORE,
        multiplier: Multiplier::Single,
    };

    pub fn new(score: u8, multiplier: u8) -> Result<Self, HitError> {
        let multiplier = Multiplier::try_from(multiplier)?;
        match score {
            1..=20 => Ok(Self { score, multiplier }),
            BULL_SCORE if multiplier == Multiplier::Triple => Err(HitError::TripleBull),
            BULL_SCORE => Ok(Self { score, multiplier }),
            other => Err(HitError::InvalidScore(other)),
        }
    }

    /// Numbered-sector hit; callers guarantee `number` is a face number.
    pub(crate) fn numbered(number: u8, multiplier: Multiplier) -> Self {
        debug_assert!((1..=20).contains(&number));
        Self {
            score: number,
            multiplier,
        }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    pub fn is_bull(&self) -> bool {
        self.score == BULL_SCORE
    }

    /// Points the dart is worth before any bust rule.
    pub fn value(&self) -> u32 {
        u32::from(self.score) * u32::from(self.multiplier.factor())
    }
}

impl std::fmt::Display for HitResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.multiplier.short_label(), self.score)
    }
}

/// Outcome text the server attaches to a throw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThrowResult {
    Winner,
    Other(String),
}

impl ThrowResult {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Winner => WINNER_RESULT,
            Self::Other(text) => text,
        }
    }
}

impl From<String> for ThrowResult {
    fn from(text: String) -> Self {
        if text == WINNER_RESULT {
            Self::Winner
        } else {
            Self::Other(text)
        }
    }
}

impl From<ThrowResult> for String {
    fn from(result: ThrowResult) -> Self {
        match result {
            ThrowResult::Winner => WINNER_RESULT.to_string(),
            ThrowResult::Other(text) => text,
        }
    }
}

/// One entry of the server's throw history.
///
/// Turn-timeout entries carry no score, multiplier or value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowRecord {
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    pub player_name: String,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub multiplier: Option<Multiplier>,
    #[serde(default)]
    pub value: Option<u32>,
    #[serde(default)]
    pub dart_number: Option<u8>,
    #[serde(default)]
    pub bust: bool,
    #[serde(default)]
    pub result: Option<ThrowResult>,
    #[serde(default)]
    pub new_score: Option<i32>,
}

impl ThrowRecord {
    /// The dart that was thrown, if this entry records one.
    pub fn hit(&self) -> Option<HitResult> {
        let score = self.score?;
        let multiplier = self.multiplier?;
        HitResult::new(score, multiplier.factor()).ok()
    }

    pub fn is_winner(&self) -> bool {
        self.result == Some(ThrowResult::Winner)
    }
}

/// Authoritative game state as broadcast by the server.
///
/// Replaced wholesale on every update; see `GameStateMirror`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(default)]
    pub game_id: String,
    /// Monotonic version, when the server provides one.
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub players: BTreeMap<PlayerId, PlayerState>,
    #[serde(default)]
    pub scores: BTreeMap<PlayerId, i32>,
    #[serde(default)]
    pub current_turn: u32,
    #[serde(default)]
    pub current_player: Option<PlayerId>,
    #[serde(default)]
    pub time_remaining: u32,
    #[serde(default)]
    pub turn_darts_thrown: u32,
    pub game_started: bool,
    pub game_over: bool,
    #[serde(default)]
    pub winner: Option<PlayerId>,
    #[serde(default)]
    pub history: Vec<ThrowRecord>,
}

impl GameSnapshot {
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn player_name(&self, id: &PlayerId) -> Option<&str> {
        self.players.get(id).map(|p| p.name.as_str())
    }

    pub fn score_of(&self, id: &PlayerId) -> Option<i32> {
        self.scores.get(id).copied()
    }

    pub fn current_player_state(&self) -> Option<&PlayerState> {
        self.current_player.as_ref().and_then(|id| self.players.get(id))
    }

    /// Darts left in the current turn, clamped to `0..=DARTS_PER_TURN`.
    pub fn darts_remaining(&self) -> u8 {
        let thrown = self.turn_darts_thrown.min(u32::from(DARTS_PER_TURN)) as u8;
        DARTS_PER_TURN - thrown
    }

    /// History with the most recent throw first.
    pub fn recent_history(&self) -> impl Iterator<Item = &ThrowRecord> {
        self.history.iter().rev()
    }
}
