use std::time::Duration;

use darts_client::config::ClientConfig;
use darts_client::controller::{Intent, SyncController, UiHooks};
use darts_client::view::GameView;
use darts_core::game_state::{GameSnapshot, ThrowRecord};
use darts_core::net::messages::{ClientMessage, GameJoinedMsg, ServerMessage};
use darts_core::notify::Notice;
use darts_core::player::PlayerId;

/// Hooks that remember every callback, for asserting on what the page saw.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub views: Vec<GameView>,
    pub notices: Vec<Notice>,
    pub connection: Vec<bool>,
    pub throws: Vec<(ThrowRecord, String)>,
    pub game_overs: Vec<(Option<PlayerId>, Option<String>)>,
    pub join_dismissed: usize,
}

impl RecordingHooks {
    pub fn last_view(&self) -> &GameView {
        self.views.last().expect("no view published")
    }

    pub fn notice_texts(&self) -> Vec<&str> {
        self.notices.iter().map(|n| n.text.as_str()).collect()
    }
}

impl UiHooks for RecordingHooks {
    fn state_changed(&mut self, view: &GameView) {
        self.views.push(view.clone());
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }

    fn connection_changed(&mut self, connected: bool) {
        self.connection.push(connected);
    }

    fn throw_landed(&mut self, record: &ThrowRecord, announcement: &str) {
        self.throws.push((record.clone(), announcement.to_string()));
    }

    fn game_over(&mut self, winner: Option<&PlayerId>, text: Option<&str>) {
        self.game_overs
            .push((winner.cloned(), text.map(str::to_string)));
    }

    fn dismiss_join_prompt(&mut self) {
        self.join_dismissed += 1;
    }
}

pub type TestController = SyncController<RecordingHooks>;

pub const GAME_ID: &str = "game-1";

pub fn secs(n: f64) -> Duration {
    Duration::from_secs_f64(n)
}

pub fn controller_with(config: ClientConfig) -> TestController {
    SyncController::new(config, RecordingHooks::default()).unwrap()
}

/// Connect as "Alice" and open the channel at t=0, discarding the intents.
pub fn opened_controller(config: ClientConfig) -> TestController {
    let mut ctl = controller_with(config);
    ctl.connect(GAME_ID, "Alice", Duration::ZERO).unwrap();
    ctl.on_channel_open(Duration::ZERO);
    ctl.drain_outbound();
    ctl
}

/// A controller whose join as `player_id` was acknowledged with `snapshot` at t=0.
pub fn joined_controller(player_id: &str, snapshot: GameSnapshot) -> TestController {
    let mut ctl = opened_controller(ClientConfig::default());
    ctl.on_message(join_ack(player_id, snapshot), Duration::ZERO);
    ctl.drain_outbound();
    ctl
}

pub fn join_ack(player_id: &str, snapshot: GameSnapshot) -> ServerMessage {
    ServerMessage::GameJoined(GameJoinedMsg {
        player_id: PlayerId::from(player_id),
        game_state: snapshot,
        game_id: None,
    })
}

/// The messages among `intents`, in order.
pub fn sent(intents: &[Intent]) -> Vec<&ClientMessage> {
    intents
        .iter()
        .filter_map(|intent| match intent {
            Intent::Send(msg) => Some(msg),
            Intent::Connect => None,
        })
        .collect()
}
