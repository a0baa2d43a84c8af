use darts_core::game_state::HitResult;
use darts_core::mirror::GameStateMirror;
use darts_core::net::messages::{GetGameStateMsg, JoinGameMsg, ThrowDartMsg};
use darts_core::player::{LocalIdentity, PlayerId};

/// Everything the controller knows about the game it is playing.
///
/// One per controller; there is no other place session data lives.
#[derive(Debug, Default)]
pub struct SessionContext {
    game_id: Option<String>,
    player_name: Option<String>,
    identity: Option<LocalIdentity>,
    mirror: GameStateMirror,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember which game to join and under what name.
    pub fn begin(&mut self, game_id: String, player_name: String) {
        self.game_id = Some(game_id);
        self.player_name = Some(player_name);
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    pub fn player_name(&self) -> Option<&str> {
        self.player_name.as_deref()
    }

    pub fn identity(&self) -> Option<&LocalIdentity> {
        self.identity.as_ref()
    }

    pub fn player_id(&self) -> Option<&PlayerId> {
        self.identity.as_ref().map(LocalIdentity::player_id)
    }

    /// Replace the identity wholesale, returning the previous one.
    ///
    /// A re-join after reconnecting may be assigned a new player id; the
    /// old one is never carried over.
    pub fn set_identity(&mut self, identity: LocalIdentity) -> Option<LocalIdentity> {
        self.game_id = Some(identity.game_id().to_string());
        self.identity.replace(identity)
    }

    pub fn mirror(&self) -> &GameStateMirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut GameStateMirror {
        &mut self.mirror
    }

    pub fn join_request(&self) -> Option<JoinGameMsg> {
        Some(JoinGameMsg {
            game_id: self.game_id.clone()?,
            player_name: self.player_name.clone()?,
        })
    }

    pub fn state_request(&self) -> Option<GetGameStateMsg> {
        Some(GetGameStateMsg {
            game_id: self.game_id.clone()?,
        })
    }

    pub fn throw_request(&self, hit: HitResult) -> Option<ThrowDartMsg> {
        Some(ThrowDartMsg {
            game_id: self.game_id.clone()?,
            score: hit.score(),
            multiplier: hit.multiplier().factor(),
        })
    }

    pub fn is_my_turn(&self) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|identity| self.mirror.is_my_turn(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_need_a_game() {
        let mut session = SessionContext::new();
        assert!(session.join_request().is_none());
        assert!(session.state_request().is_none());

        session.begin("g1".to_string(), "Alice".to_string());
        assert_eq!(
            session.join_request(),
            Some(JoinGameMsg {
                game_id: "g1".to_string(),
                player_name: "Alice".to_string(),
            })
        );
        let throw = session.throw_request(HitResult::DOUBLE_BULL).unwrap();
        assert_eq!((throw.score, throw.multiplier), (25, 2));
    }

    #[test]
    fn identity_is_replaced_wholesale() {
        let mut session = SessionContext::new();
        session.begin("g1".to_string(), "Alice".to_string());
        assert!(
            session
                .set_identity(LocalIdentity::new("g1", PlayerId::from("sid-1")))
                .is_none()
        );
        let old = session.set_identity(LocalIdentity::new("g1", PlayerId::from("sid-2")));
        assert_eq!(old.map(|i| i.player_id().clone()), Some(PlayerId::from("sid-1")));
        assert_eq!(session.player_id(), Some(&PlayerId::from("sid-2")));
        assert_eq!(session.player_name(), Some("Alice"));
    }
}
