use std::time::Duration;

use glam::DVec2;
use serde::Serialize;

use darts_core::board::{self, BoardGeometry, Viewport};
use darts_core::game_state::{GameSnapshot, HitResult, TURN_TIME_SECONDS, ThrowRecord};
use darts_core::mirror::{ApplyOutcome, GameStateMirror};
use darts_core::net::messages::{
    ClientMessage, DartThrownMsg, GameJoinedMsg, HeartbeatMsg, PlayerDisconnectedMsg,
    ServerMessage,
};
use darts_core::notify::{Notice, NoticeQueue, Toast};
use darts_core::player::{LocalIdentity, NameError, PlayerId, validate_player_name};

use crate::clock::TurnClock;
use crate::config::{ClientConfig, ConfigError};
use crate::input_gate::{ClosedReason, InputGate};
use crate::reconnect::ReconnectPolicy;
use crate::session::SessionContext;
use crate::timers::{TimerKind, TimerSet};
use crate::view::{GameView, ViewContext, throw_announcement, winner_text};

/// Server error messages that mean "you may not throw right now".
pub const INVALID_TURN_ERRORS: [&str; 3] = ["Not your turn", "Turn is over", "Game is over"];

pub const RECONNECTING_NOTICE: &str = "Disconnected from server. Reconnecting...";
pub const REFRESH_NOTICE: &str = "Connection lost. Please refresh the page.";

/// Session phase. Ordered: game phases only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Disconnected,
    Connecting,
    WaitingForOpponent,
    InProgress,
    GameOver,
}

/// Work the host must perform on the controller's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Open (or re-open) the channel; report back with `on_channel_open`
    /// or `on_channel_closed`.
    Connect,
    Send(ClientMessage),
}

/// What became of a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrowAttempt {
    Sent(HitResult),
    /// Landed outside the double ring.
    Miss,
    Rejected(ClosedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    InvalidTurn,
    Channel,
}

pub fn classify_server_error(message: &str) -> ServerErrorKind {
    if INVALID_TURN_ERRORS.contains(&message.trim()) {
        ServerErrorKind::InvalidTurn
    } else {
        ServerErrorKind::Channel
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    EmptyGameId,
    InvalidName(NameError),
    /// A session is already connecting or connected.
    SessionActive,
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyGameId => write!(f, "game id is empty"),
            Self::InvalidName(e) => write!(f, "{e}"),
            Self::SessionActive => write!(f, "already connected to a game"),
        }
    }
}

impl std::error::Error for JoinError {}

impl From<NameError> for JoinError {
    fn from(e: NameError) -> Self {
        Self::InvalidName(e)
    }
}

/// Rendering and notification callbacks. Every method defaults to a no-op.
pub trait UiHooks {
    fn state_changed(&mut self, _view: &GameView) {}
    fn notify(&mut self, _notice: &Notice) {}
    fn connection_changed(&mut self, _connected: bool) {}
    fn throw_landed(&mut self, _record: &ThrowRecord, _announcement: &str) {}
    fn game_over(&mut self, _winner: Option<&PlayerId>, _text: Option<&str>) {}
    fn dismiss_join_prompt(&mut self) {}
}

impl UiHooks for () {}

/// The turn-synchronization state machine.
///
/// Sans-IO: the host feeds channel events, inbound messages and the current
/// monotonic time in, and drains [`Intent`]s out. All mutation happens in
/// those calls, so a single-threaded event loop owns it outright.
pub struct SyncController<H: UiHooks> {
    config: ClientConfig,
    geometry: BoardGeometry,
    session: SessionContext,
    phase: Phase,
    connected: bool,
    clock: TurnClock,
    gate: InputGate,
    timers: TimerSet,
    reconnect: ReconnectPolicy,
    notices: NoticeQueue,
    outbound: Vec<Intent>,
    hooks: H,
    now: Duration,
}

impl<H: UiHooks> SyncController<H> {
    pub fn new(config: ClientConfig, hooks: H) -> Result<Self, ConfigError> {
        config.validate()?;
        let geometry = config.board_geometry()?;
        Ok(Self {
            geometry,
            session: SessionContext::new(),
            phase: Phase::Disconnected,
            connected: false,
            clock: TurnClock::new(TURN_TIME_SECONDS, config.ui.timer_warning_secs),
            gate: InputGate::new(),
            timers: TimerSet::new(),
            reconnect: ReconnectPolicy::from_config(&config.reconnect),
            notices: NoticeQueue::with_duration(config.notice_duration()),
            outbound: Vec::new(),
            hooks,
            now: Duration::ZERO,
            config,
        })
    }

    // ================================================================
    // Host entry points
    // ================================================================

    /// Start a session: validate the join request and ask for a channel.
    ///
    /// Anything left from an earlier session (identity, snapshot, the
    /// end-of-game lock, status banners) is discarded first.
    pub fn connect(
        &mut self,
        game_id: &str,
        player_name: &str,
        now: Duration,
    ) -> Result<(), JoinError> {
        self.now = now;
        if self.phase != Phase::Disconnected || self.connected {
            return Err(JoinError::SessionActive);
        }
        let game_id = game_id.trim();
        if game_id.is_empty() {
            return Err(JoinError::EmptyGameId);
        }
        let name = validate_player_name(player_name)?;
        tracing::info!(game_id, player_name = %name, "Connecting");
        self.reset_session(now);
        self.session.begin(game_id.to_string(), name);
        self.phase = Phase::Connecting;
        self.outbound.push(Intent::Connect);
        self.publish();
        Ok(())
    }

    pub fn on_channel_open(&mut self, now: Duration) {
        self.now = now;
        self.connected = true;
        self.reconnect.reset();
        self.timers.cancel(TimerKind::Reconnect);
        if self.phase == Phase::Disconnected {
            self.phase = Phase::Connecting;
        }
        self.notices.dismiss_persistent(now);
        self.hooks.connection_changed(true);
        tracing::info!("Channel open");

        // Session continuity is never assumed: every open re-joins by name.
        match self.session.join_request() {
            Some(join) => self.send(ClientMessage::JoinGame(join)),
            None => tracing::warn!("Channel opened without a game to join"),
        }
        self.timers
            .arm_repeating(TimerKind::Heartbeat, self.config.heartbeat(), now);
        self.publish();
    }

    pub fn on_channel_closed(&mut self, now: Duration) {
        self.now = now;
        let was_connected = std::mem::replace(&mut self.connected, false);
        self.timers.cancel(TimerKind::Heartbeat);
        self.stop_turn_timers();
        // Throws still in flight died with the channel.
        self.gate.clear_in_flight();
        self.phase = Phase::Disconnected;
        if was_connected {
            tracing::warn!("Channel closed");
            self.hooks.connection_changed(false);
        }

        if self.gate.is_locked() || self.session.game_id().is_none() {
            self.publish();
            return;
        }
        match self.reconnect.next_delay() {
            Some(delay) => {
                tracing::info!(
                    attempt = self.reconnect.attempts(),
                    max_attempts = self.reconnect.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Reconnect scheduled"
                );
                self.timers.arm_once(TimerKind::Reconnect, delay, now);
                self.notify(Notice::error(RECONNECTING_NOTICE).persistent());
            },
            None => {
                tracing::warn!(
                    attempts = self.reconnect.attempts(),
                    "Reconnection attempts exhausted"
                );
                self.notices.dismiss_persistent(now);
                self.notify(Notice::error(REFRESH_NOTICE).persistent());
            },
        }
        self.publish();
    }

    /// Fire every timer due at `now`.
    pub fn poll_timers(&mut self, now: Duration) {
        self.now = now;
        let mut changed = self.notices.prune(now);
        for kind in self.timers.due(now) {
            match kind {
                TimerKind::ClockTick => {
                    self.clock.tick();
                    changed = true;
                },
                TimerKind::StatePoll => self.request_state(),
                TimerKind::Heartbeat => self.send(ClientMessage::Heartbeat(HeartbeatMsg {})),
                TimerKind::Reconnect => {
                    tracing::info!(attempt = self.reconnect.attempts(), "Reconnecting");
                    self.phase = Phase::Connecting;
                    self.outbound.push(Intent::Connect);
                    changed = true;
                },
            }
        }
        if changed {
            self.publish();
        }
    }

    pub fn on_message(&mut self, msg: ServerMessage, now: Duration) {
        self.now = now;
        tracing::trace!(event = msg.message_type().event_name(), "Inbound event");
        match msg {
            ServerMessage::GameJoined(m) => self.on_joined(m),
            ServerMessage::PlayerJoined(m) => {
                self.notify(Notice::info(format!("{} joined the game!", m.player_name)));
                self.apply_snapshot(m.game_state, false);
            },
            ServerMessage::GameStarted(m) => {
                self.notify(Notice::info("Game started! Good luck!"));
                self.apply_snapshot(m.game_state, false);
            },
            ServerMessage::DartThrown(m) => self.on_dart_thrown(*m),
            ServerMessage::PlayerDisconnected(m) => self.on_player_disconnected(m),
            ServerMessage::GameStateUpdate(m) => self.apply_snapshot(m.game_state, false),
            ServerMessage::Error(m) => self.on_server_error(m.message),
            ServerMessage::HeartbeatAck(_) => tracing::trace!("Heartbeat acknowledged"),
        }
    }

    /// Turn a click in board coordinates into a throw, if the gate allows.
    pub fn throw_at(&mut self, point: DVec2) -> ThrowAttempt {
        if let Err(reason) = self.gate_check() {
            tracing::trace!(?reason, "Input rejected");
            return ThrowAttempt::Rejected(reason);
        }
        let Some(hit) = board::map(point, &self.geometry) else {
            return ThrowAttempt::Miss;
        };
        let Some(request) = self.session.throw_request(hit) else {
            return ThrowAttempt::Rejected(ClosedReason::NotJoined);
        };
        tracing::debug!(%hit, "Throwing dart");
        self.gate.record_throw();
        self.send(ClientMessage::ThrowDart(request));
        self.publish();
        ThrowAttempt::Sent(hit)
    }

    /// Like [`throw_at`](Self::throw_at), for a click in page coordinates.
    pub fn throw_at_viewport(&mut self, client: DVec2, viewport: &Viewport) -> ThrowAttempt {
        match board::viewport_to_board(client, viewport, self.config.logical_size()) {
            Some(point) => self.throw_at(point),
            None => match self.gate_check() {
                Ok(()) => ThrowAttempt::Miss,
                Err(reason) => ThrowAttempt::Rejected(reason),
            },
        }
    }

    pub fn drain_outbound(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.outbound)
    }

    // ================================================================
    // Queries
    // ================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn identity(&self) -> Option<&LocalIdentity> {
        self.session.identity()
    }

    pub fn mirror(&self) -> &GameStateMirror {
        self.session.mirror()
    }

    pub fn clock(&self) -> &TurnClock {
        &self.clock
    }

    pub fn gate(&self) -> &InputGate {
        &self.gate
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn reconnect_policy(&self) -> &ReconnectPolicy {
        &self.reconnect
    }

    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn notices(&self) -> &[Toast] {
        self.notices.visible()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn is_input_accepted(&self) -> bool {
        self.gate_check().is_ok()
    }

    pub fn view(&self) -> GameView {
        GameView::build(&self.session, ViewContext {
            phase: self.phase,
            connected: self.connected,
            board_enabled: self.is_input_accepted(),
            clock: &self.clock,
            notices: self.notices.visible(),
        })
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    // ================================================================
    // Inbound handling
    // ================================================================

    fn on_joined(&mut self, m: GameJoinedMsg) {
        let game_id = m
            .game_id
            .or_else(|| self.session.game_id().map(str::to_string))
            .unwrap_or_default();
        let identity = LocalIdentity::new(game_id, m.player_id);
        tracing::info!(
            game_id = identity.game_id(),
            player_id = %identity.player_id(),
            "Joined game"
        );
        if let Some(previous) = self.session.set_identity(identity)
            && Some(previous.player_id()) != self.session.player_id()
        {
            tracing::warn!(
                previous = %previous.player_id(),
                "Re-join assigned a new player id"
            );
        }
        self.hooks.dismiss_join_prompt();
        self.apply_snapshot(m.game_state, true);
    }

    fn on_dart_thrown(&mut self, m: DartThrownMsg) {
        let DartThrownMsg {
            throw,
            game_state,
            game_over,
            winner,
            turn_over,
        } = m;
        let announcement = throw_announcement(&throw);
        tracing::debug!(%announcement, turn_over, "Dart landed");
        self.hooks.throw_landed(&throw, &announcement);
        self.apply_snapshot(game_state, false);
        if game_over && self.phase != Phase::GameOver && self.phase >= Phase::WaitingForOpponent {
            self.finish_game(winner);
            self.publish();
        }
    }

    fn on_player_disconnected(&mut self, m: PlayerDisconnectedMsg) {
        self.notify(Notice::info(format!("{} disconnected", m.player_name)));
        if !self.session.mirror_mut().patch_disconnect(&m.player_id) {
            tracing::debug!(player_id = %m.player_id, "Disconnect for unknown player");
        }
        self.publish();
    }

    fn on_server_error(&mut self, message: String) {
        match classify_server_error(&message) {
            ServerErrorKind::InvalidTurn => {
                tracing::debug!(%message, "Server rejected turn action");
                // Whatever we sent was refused; resync before trusting the gate.
                self.gate.clear_in_flight();
                self.notify(Notice::error(message));
                self.request_state();
            },
            ServerErrorKind::Channel => {
                tracing::warn!(%message, "Server error");
                self.notify(Notice::error(message));
            },
        }
        self.publish();
    }

    fn apply_snapshot(&mut self, snapshot: GameSnapshot, join_ack: bool) {
        let time_remaining = snapshot.time_remaining;
        if let ApplyOutcome::Stale { .. } = self.session.mirror_mut().apply_snapshot(snapshot) {
            return;
        }
        self.gate.on_snapshot(self.session.mirror().snapshot());
        self.clock.resync(time_remaining);
        self.advance_phase(join_ack);
        self.publish();
    }

    // ================================================================
    // Phase transitions
    // ================================================================

    fn snapshot_phase(&self) -> Phase {
        let mirror = self.session.mirror();
        if mirror.is_over() {
            Phase::GameOver
        } else if mirror.is_started() {
            Phase::InProgress
        } else {
            Phase::WaitingForOpponent
        }
    }

    fn advance_phase(&mut self, join_ack: bool) {
        let target = self.snapshot_phase();
        match self.phase {
            Phase::Disconnected => return,
            Phase::Connecting if !join_ack => return,
            current if target <= current => {
                if target < current {
                    tracing::debug!(?current, ?target, "Ignoring backward phase change");
                }
                return;
            },
            _ => {},
        }
        tracing::info!(from = ?self.phase, to = ?target, "Phase change");
        match target {
            Phase::WaitingForOpponent => {
                self.phase = target;
                self.stop_turn_timers();
            },
            Phase::InProgress => {
                self.phase = target;
                self.clock.start();
                self.timers
                    .ensure_repeating(TimerKind::ClockTick, self.config.clock_tick(), self.now);
                self.timers
                    .ensure_repeating(TimerKind::StatePoll, self.config.state_poll(), self.now);
                self.hooks.dismiss_join_prompt();
            },
            Phase::GameOver => self.finish_game(None),
            Phase::Disconnected | Phase::Connecting => {},
        }
    }

    fn finish_game(&mut self, winner: Option<PlayerId>) {
        self.phase = Phase::GameOver;
        self.stop_turn_timers();
        self.gate.lock();
        let winner = winner.or_else(|| self.session.mirror().winner().cloned());
        let text = match (self.session.mirror().snapshot(), winner.as_ref()) {
            (Some(snapshot), Some(w)) => Some(winner_text(snapshot, w, self.session.identity())),
            _ => None,
        };
        tracing::info!(?winner, "Game over");
        self.hooks.game_over(winner.as_ref(), text.as_deref());
    }

    fn reset_session(&mut self, now: Duration) {
        if self.session.game_id().is_some() {
            tracing::debug!(previous = ?self.session.game_id(), "Discarding previous session");
        }
        self.session = SessionContext::new();
        self.gate = InputGate::new();
        self.clock = TurnClock::new(TURN_TIME_SECONDS, self.config.ui.timer_warning_secs);
        self.timers = TimerSet::new();
        self.reconnect.reset();
        self.notices.dismiss_persistent(now);
    }

    fn stop_turn_timers(&mut self) {
        self.clock.stop();
        self.timers.cancel(TimerKind::ClockTick);
        self.timers.cancel(TimerKind::StatePoll);
    }

    // ================================================================
    // Helpers
    // ================================================================

    fn gate_check(&self) -> Result<(), ClosedReason> {
        match self.phase {
            Phase::InProgress if self.connected => {},
            Phase::GameOver => return Err(ClosedReason::GameOver),
            Phase::WaitingForOpponent if self.connected => return Err(ClosedReason::NotStarted),
            _ => return Err(ClosedReason::Disconnected),
        }
        self.gate.check(self.session.identity(), self.session.mirror())
    }

    fn send(&mut self, msg: ClientMessage) {
        if !self.connected {
            tracing::debug!(
                event = msg.message_type().event_name(),
                "Dropping outbound event while disconnected"
            );
            return;
        }
        self.outbound.push(Intent::Send(msg));
    }

    fn request_state(&mut self) {
        if let Some(request) = self.session.state_request() {
            self.send(ClientMessage::GetGameState(request));
        }
    }

    fn notify(&mut self, notice: Notice) {
        self.hooks.notify(&notice);
        self.notices.push(notice, self.now);
    }

    fn publish(&mut self) {
        let view = self.view();
        self.hooks.state_changed(&view);
    }
}
