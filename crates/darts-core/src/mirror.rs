use std::collections::BTreeSet;

use crate::game_state::{DARTS_PER_TURN, GameSnapshot};
use crate::player::{LocalIdentity, PlayerId, PlayerState};

/// Result of offering a snapshot to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Both snapshots carried a version and the incoming one was older.
    Stale { held: u64, incoming: u64 },
}

/// Client-side copy of the last authoritative snapshot.
///
/// Snapshots replace the held state wholesale. Without a `version` on both
/// sides there is no way to tell a late stale snapshot from a fresh one, so
/// the last one applied wins. The only local edit is the optimistic
/// disconnect patch, which the next applied snapshot discards.
#[derive(Debug, Default)]
pub struct GameStateMirror {
    snapshot: Option<GameSnapshot>,
    optimistic_offline: BTreeSet<PlayerId>,
}

impl GameStateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) -> ApplyOutcome {
        if let Some(held) = self.snapshot.as_ref().and_then(|s| s.version)
            && let Some(incoming) = snapshot.version
            && incoming < held
        {
            tracing::debug!(held, incoming, "Ignoring stale snapshot");
            return ApplyOutcome::Stale { held, incoming };
        }
        self.snapshot = Some(snapshot);
        self.optimistic_offline.clear();
        ApplyOutcome::Applied
    }

    /// Mark a player offline ahead of the next snapshot.
    ///
    /// Returns false when there is no snapshot or the player is unknown.
    pub fn patch_disconnect(&mut self, player_id: &PlayerId) -> bool {
        let Some(player) = self
            .snapshot
            .as_mut()
            .and_then(|s| s.players.get_mut(player_id))
        else {
            return false;
        };
        player.connected = false;
        self.optimistic_offline.insert(player_id.clone());
        true
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.snapshot.as_ref().and_then(|s| s.player(id))
    }

    /// Whether `id`'s offline flag comes from a local patch rather than the server.
    pub fn is_optimistic(&self, id: &PlayerId) -> bool {
        self.optimistic_offline.contains(id)
    }

    pub fn is_started(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.game_started)
    }

    pub fn is_over(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.game_over)
    }

    pub fn is_my_turn(&self, identity: &LocalIdentity) -> bool {
        self.snapshot.as_ref().is_some_and(|s| {
            s.game_started
                && !s.game_over
                && s.current_player.as_ref() == Some(identity.player_id())
        })
    }

    pub fn darts_remaining(&self) -> u8 {
        self.snapshot
            .as_ref()
            .map_or(DARTS_PER_TURN, GameSnapshot::darts_remaining)
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.snapshot.as_ref().map(|s| s.time_remaining)
    }

    pub fn current_player(&self) -> Option<&PlayerId> {
        self.snapshot.as_ref().and_then(|s| s.current_player.as_ref())
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.snapshot.as_ref().and_then(|s| s.winner.as_ref())
    }
}
