pub mod board;
pub mod game_state;
pub mod mirror;
pub mod net;
pub mod notify;
pub mod player;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::BTreeMap;

    use crate::game_state::{
        GameSnapshot, Multiplier, STARTING_SCORE, TURN_TIME_SECONDS, ThrowRecord,
    };
    use crate::player::{PlayerId, PlayerState};

    /// Display names used for the two fixture players "A" and "B".
    pub const NAME_A: &str = "Alice";
    pub const NAME_B: &str = "Bob";

    fn roster(ids: &[&str]) -> BTreeMap<PlayerId, PlayerState> {
        ids.iter()
            .map(|id| {
                let name = match *id {
                    "A" => NAME_A.to_string(),
                    "B" => NAME_B.to_string(),
                    other => format!("Player {other}"),
                };
                let pid = PlayerId::from(*id);
                (
                    pid.clone(),
                    PlayerState {
                        id: pid,
                        name,
                        connected: true,
                    },
                )
            })
            .collect()
    }

    fn starting_scores(ids: &[&str]) -> BTreeMap<PlayerId, i32> {
        ids.iter()
            .map(|id| (PlayerId::from(*id), STARTING_SCORE))
            .collect()
    }

    /// One player ("A") has joined; the game has not started.
    pub fn waiting_snapshot() -> GameSnapshot {
        GameSnapshot {
            game_id: "game-1".to_string(),
            players: roster(&["A"]),
            scores: starting_scores(&["A"]),
            current_player: Some(PlayerId::from("A")),
            time_remaining: TURN_TIME_SECONDS,
            ..GameSnapshot::default()
        }
    }

    /// Players "A" and "B", started, `current` to throw with a full turn ahead.
    pub fn in_progress_snapshot(current: &str) -> GameSnapshot {
        GameSnapshot {
            game_id: "game-1".to_string(),
            players: roster(&["A", "B"]),
            scores: starting_scores(&["A", "B"]),
            current_player: Some(PlayerId::from(current)),
            time_remaining: TURN_TIME_SECONDS,
            game_started: true,
            ..GameSnapshot::default()
        }
    }

    /// A finished game won by `winner`, whose score is zero.
    pub fn finished_snapshot(winner: &str) -> GameSnapshot {
        let mut snap = in_progress_snapshot(winner);
        snap.game_over = true;
        snap.winner = Some(PlayerId::from(winner));
        snap.scores.insert(PlayerId::from(winner), 0);
        snap
    }

    /// A scoring throw history entry.
    pub fn throw_record(
        player_name: &str,
        score: u8,
        multiplier: Multiplier,
        new_score: i32,
    ) -> ThrowRecord {
        ThrowRecord {
            player_id: None,
            player_name: player_name.to_string(),
            score: Some(score),
            multiplier: Some(multiplier),
            value: Some(u32::from(score) * u32::from(multiplier.factor())),
            dart_number: Some(1),
            bust: false,
            result: None,
            new_score: Some(new_score),
        }
    }

    /// A "Turn timed out" history entry, which carries no dart.
    pub fn timeout_record(player_name: &str) -> ThrowRecord {
        ThrowRecord {
            player_id: None,
            player_name: player_name.to_string(),
            score: None,
            multiplier: None,
            value: None,
            dart_number: None,
            bust: false,
            result: Some("Turn timed out".to_string().into()),
            new_score: None,
        }
    }
}
