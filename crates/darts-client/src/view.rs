use serde::Serialize;

use darts_core::game_state::{GameSnapshot, TURN_TIME_SECONDS, ThrowRecord};
use darts_core::notify::{Notice, Toast};
use darts_core::player::{LocalIdentity, PlayerId};

use crate::clock::TurnClock;
use crate::controller::Phase;
use crate::session::SessionContext;

/// Everything the page needs to draw, derived from controller state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub phase: Phase,
    pub connected: bool,
    pub game_id: Option<String>,
    pub scoreboard: Vec<ScoreRow>,
    pub turn_label: String,
    pub status_text: String,
    pub darts_remaining: u8,
    pub timer_text: String,
    pub timer_warning: bool,
    pub board_enabled: bool,
    pub history: Vec<HistoryLine>,
    pub winner_text: Option<String>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRow {
    pub player_id: PlayerId,
    pub name: String,
    pub score: i32,
    pub is_current: bool,
    pub is_you: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLine {
    pub text: String,
    pub bust: bool,
    pub winner: bool,
}

/// Inputs to [`GameView::build`] that live outside the session.
pub struct ViewContext<'a> {
    pub phase: Phase,
    pub connected: bool,
    pub board_enabled: bool,
    pub clock: &'a TurnClock,
    pub notices: &'a [Toast],
}

impl GameView {
    pub fn build(session: &SessionContext, ctx: ViewContext<'_>) -> Self {
        let identity = session.identity();
        let snapshot = session.mirror().snapshot();
        Self {
            phase: ctx.phase,
            connected: ctx.connected,
            game_id: session.game_id().map(str::to_string),
            scoreboard: snapshot
                .map(|s| scoreboard(s, identity))
                .unwrap_or_default(),
            turn_label: turn_label(snapshot, identity),
            status_text: status_text(snapshot, identity),
            darts_remaining: session.mirror().darts_remaining(),
            timer_text: timer_text(snapshot, ctx.clock),
            timer_warning: snapshot.is_some_and(|s| s.game_started && !s.game_over)
                && ctx.clock.is_warning(),
            board_enabled: ctx.board_enabled,
            history: snapshot
                .map(|s| s.recent_history().map(history_line).collect())
                .unwrap_or_default(),
            winner_text: snapshot
                .filter(|s| s.game_over)
                .and_then(|s| s.winner.as_ref().map(|w| winner_text(s, w, identity))),
            notices: ctx.notices.iter().map(|t| t.notice.clone()).collect(),
        }
    }
}

fn is_me(identity: Option<&LocalIdentity>, id: &PlayerId) -> bool {
    identity.is_some_and(|i| i.player_id() == id)
}

fn scoreboard(snapshot: &GameSnapshot, identity: Option<&LocalIdentity>) -> Vec<ScoreRow> {
    snapshot
        .players
        .values()
        .map(|player| ScoreRow {
            player_id: player.id.clone(),
            name: player.name.clone(),
            score: snapshot.score_of(&player.id).unwrap_or_default(),
            is_current: snapshot.current_player.as_ref() == Some(&player.id),
            is_you: is_me(identity, &player.id),
            connected: player.connected,
        })
        .collect()
}

fn turn_label(snapshot: Option<&GameSnapshot>, identity: Option<&LocalIdentity>) -> String {
    let Some(snapshot) = snapshot.filter(|s| s.game_started) else {
        return "Waiting...".to_string();
    };
    if snapshot.game_over {
        return "Game Over".to_string();
    }
    match snapshot.current_player_state() {
        Some(player) if is_me(identity, &player.id) => format!("{} (Your turn!)", player.name),
        Some(player) => player.name.clone(),
        None => String::new(),
    }
}

fn status_text(snapshot: Option<&GameSnapshot>, identity: Option<&LocalIdentity>) -> String {
    let Some(snapshot) = snapshot else {
        return "Connecting...".to_string();
    };
    if !snapshot.game_started {
        return if snapshot.players.len() < 2 {
            "Waiting for another player to join...".to_string()
        } else {
            "Game is about to start...".to_string()
        };
    }
    if snapshot.game_over {
        return "Game finished!".to_string();
    }
    match snapshot.current_player_state() {
        Some(player) if is_me(identity, &player.id) => {
            "Your turn! Click the dartboard to throw.".to_string()
        },
        Some(player) => format!("Waiting for {} to throw...", player.name),
        None => String::new(),
    }
}

fn timer_text(snapshot: Option<&GameSnapshot>, clock: &TurnClock) -> String {
    match snapshot {
        Some(s) if s.game_over => "-".to_string(),
        Some(s) if s.game_started => clock.remaining().to_string(),
        _ => TURN_TIME_SECONDS.to_string(),
    }
}

/// One history entry, e.g. `Alice: D20 (40 points) - Bust! → 61`.
pub fn history_line(record: &ThrowRecord) -> HistoryLine {
    let mut text = format!("{}: ", record.player_name);
    if let Some(hit) = record.hit() {
        let value = record.value.unwrap_or_else(|| hit.value());
        text.push_str(&format!("{hit} ({value} points)"));
    }
    if let Some(result) = &record.result {
        text.push_str(&format!(" - {}", result.as_str()));
    }
    if let Some(new_score) = record.new_score {
        text.push_str(&format!(" → {new_score}"));
    }
    HistoryLine {
        text,
        bust: record.bust,
        winner: record.is_winner(),
    }
}

/// Announcement for a throw that just landed, e.g. `Bob threw Triple 20 (60 points)`.
pub fn throw_announcement(record: &ThrowRecord) -> String {
    let mut text = match record.hit() {
        Some(hit) => format!(
            "{} threw {}{} ({} points)",
            record.player_name,
            hit.multiplier().long_label(),
            hit.score(),
            record.value.unwrap_or_else(|| hit.value())
        ),
        None => record.player_name.clone(),
    };
    if let Some(result) = &record.result {
        text.push_str(&format!(" - {}", result.as_str()));
    }
    text
}

pub fn winner_text(
    snapshot: &GameSnapshot,
    winner: &PlayerId,
    identity: Option<&LocalIdentity>,
) -> String {
    if is_me(identity, winner) {
        return "Congratulations! You won!".to_string();
    }
    match snapshot.player_name(winner) {
        Some(name) => format!("{name} wins! Better luck next time!"),
        None => format!("Player {winner} wins!"),
    }
}
