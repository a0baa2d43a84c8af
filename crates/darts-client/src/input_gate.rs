use darts_core::game_state::GameSnapshot;
use darts_core::mirror::GameStateMirror;
use darts_core::player::{LocalIdentity, PlayerId};

/// Why a click was not turned into a throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedReason {
    /// No open channel, or the join has not been acknowledged yet.
    Disconnected,
    NotJoined,
    NotStarted,
    NotYourTurn,
    GameOver,
    /// Every remaining dart of the turn is already awaiting the server.
    ThrowsInFlight,
}

/// Decides whether pointer input may become a throw.
///
/// Openness is derived from the mirror on every check; the only local
/// state is the count of throws the server has not yet accounted for and
/// the end-of-game lock, which is never lifted.
#[derive(Debug, Default)]
pub struct InputGate {
    in_flight: u8,
    mark: Option<TurnMark>,
    locked: bool,
}

/// Where the last applied snapshot placed the game within a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TurnMark {
    turn: u32,
    player: Option<PlayerId>,
    darts_thrown: u32,
}

impl TurnMark {
    fn of(snapshot: &GameSnapshot) -> Self {
        Self {
            turn: snapshot.current_turn,
            player: snapshot.current_player.clone(),
            darts_thrown: snapshot.turn_darts_thrown,
        }
    }

    fn same_turn(&self, other: &Self) -> bool {
        self.turn == other.turn && self.player == other.player
    }
}

impl InputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(
        &self,
        identity: Option<&LocalIdentity>,
        mirror: &GameStateMirror,
    ) -> Result<(), ClosedReason> {
        if self.locked || mirror.is_over() {
            return Err(ClosedReason::GameOver);
        }
        let Some(identity) = identity else {
            return Err(ClosedReason::NotJoined);
        };
        if !mirror.is_started() {
            return Err(ClosedReason::NotStarted);
        }
        if !mirror.is_my_turn(identity) {
            return Err(ClosedReason::NotYourTurn);
        }
        if self.in_flight >= mirror.darts_remaining() {
            return Err(ClosedReason::ThrowsInFlight);
        }
        Ok(())
    }

    pub fn is_input_accepted(
        &self,
        identity: Option<&LocalIdentity>,
        mirror: &GameStateMirror,
    ) -> bool {
        self.check(identity, mirror).is_ok()
    }

    pub fn record_throw(&mut self) {
        self.in_flight = self.in_flight.saturating_add(1);
    }

    /// Settle in-flight throws against a newly applied snapshot.
    ///
    /// A snapshot taken before the server processed our throws (a poll
    /// answered early) leaves them in flight. Darts counted within the
    /// same turn settle one each; a new turn settles all of them.
    pub fn on_snapshot(&mut self, snapshot: Option<&GameSnapshot>) {
        let mut mark = snapshot.map(TurnMark::of);
        match (self.mark.as_ref(), mark.as_mut()) {
            (Some(prev), Some(next)) if prev.same_turn(next) => {
                let settled = next.darts_thrown.saturating_sub(prev.darts_thrown);
                let settled = u8::try_from(settled).unwrap_or(u8::MAX);
                self.in_flight = self.in_flight.saturating_sub(settled);
                next.darts_thrown = next.darts_thrown.max(prev.darts_thrown);
            },
            _ => self.in_flight = 0,
        }
        self.mark = mark;
    }

    /// Forget throws the server will never answer (refused or lost with
    /// the channel).
    pub fn clear_in_flight(&mut self) {
        self.in_flight = 0;
    }

    pub fn in_flight(&self) -> u8 {
        self.in_flight
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darts_core::player::PlayerId;
    use darts_core::test_helpers::{finished_snapshot, in_progress_snapshot, waiting_snapshot};

    fn me(id: &str) -> LocalIdentity {
        LocalIdentity::new("game-1", PlayerId::from(id))
    }

    fn mirror_with(snapshot: darts_core::game_state::GameSnapshot) -> GameStateMirror {
        let mut mirror = GameStateMirror::new();
        mirror.apply_snapshot(snapshot);
        mirror
    }

    #[test]
    fn open_on_my_turn() {
        let gate = InputGate::new();
        let mirror = mirror_with(in_progress_snapshot("A"));
        assert!(gate.is_input_accepted(Some(&me("A")), &mirror));
        assert_eq!(
            gate.check(Some(&me("B")), &mirror),
            Err(ClosedReason::NotYourTurn)
        );
    }

    #[test]
    fn closed_without_identity_or_snapshot() {
        let gate = InputGate::new();
        assert_eq!(
            gate.check(None, &mirror_with(in_progress_snapshot("A"))),
            Err(ClosedReason::NotJoined)
        );
        assert_eq!(
            gate.check(Some(&me("A")), &GameStateMirror::new()),
            Err(ClosedReason::NotStarted)
        );
        assert_eq!(
            gate.check(Some(&me("A")), &mirror_with(waiting_snapshot())),
            Err(ClosedReason::NotStarted)
        );
    }

    #[test]
    fn closed_when_over() {
        let gate = InputGate::new();
        let mirror = mirror_with(finished_snapshot("A"));
        assert_eq!(
            gate.check(Some(&me("A")), &mirror),
            Err(ClosedReason::GameOver)
        );
    }

    #[test]
    fn in_flight_throws_close_the_gate() {
        let mut gate = InputGate::new();
        let mut snap = in_progress_snapshot("A");
        snap.turn_darts_thrown = 1;
        let mirror = mirror_with(snap);
        gate.record_throw();
        assert!(gate.is_input_accepted(Some(&me("A")), &mirror));
        gate.record_throw();
        assert_eq!(
            gate.check(Some(&me("A")), &mirror),
            Err(ClosedReason::ThrowsInFlight)
        );
        gate.clear_in_flight();
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.is_input_accepted(Some(&me("A")), &mirror));
    }

    #[test]
    fn snapshots_settle_only_processed_throws() {
        let mut gate = InputGate::new();
        let snap = in_progress_snapshot("A");
        gate.on_snapshot(Some(&snap));
        for _ in 0..3 {
            gate.record_throw();
        }

        // Same turn, nothing counted yet: all three still pending.
        gate.on_snapshot(Some(&snap));
        assert_eq!(gate.in_flight(), 3);

        let mut two_counted = snap.clone();
        two_counted.turn_darts_thrown = 2;
        gate.on_snapshot(Some(&two_counted));
        assert_eq!(gate.in_flight(), 1);

        // A late, older snapshot neither re-adds nor double-counts throws.
        gate.on_snapshot(Some(&snap));
        assert_eq!(gate.in_flight(), 1);
        gate.on_snapshot(Some(&two_counted));
        assert_eq!(gate.in_flight(), 1);

        let mut next_turn = in_progress_snapshot("B");
        next_turn.current_turn = 1;
        gate.on_snapshot(Some(&next_turn));
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn first_snapshot_settles_everything() {
        let mut gate = InputGate::new();
        gate.record_throw();
        gate.on_snapshot(Some(&in_progress_snapshot("A")));
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn lock_is_permanent() {
        let mut gate = InputGate::new();
        gate.lock();
        gate.on_snapshot(Some(&in_progress_snapshot("A")));
        let mirror = mirror_with(in_progress_snapshot("A"));
        assert_eq!(
            gate.check(Some(&me("A")), &mirror),
            Err(ClosedReason::GameOver)
        );
        assert!(gate.is_locked());
    }
}
