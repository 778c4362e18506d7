//! Session types: one matched pair of participants and their shared,
//! ephemeral state.
//!
//! A session tracks:
//! - WHO is in it (at most two connections, in join order)
//! - WHICH role each of them plays (creator `A`, joiner `B`)
//! - WHERE it is in its lifecycle ([`SessionPhase`])
//! - an opaque auxiliary state blob the application wants echoed back
//!   to late state queries

use duelforge_protocol::{DirectoryEntry, Role, SessionId, SessionPhase};
use duelforge_transport::ConnectionId;

use crate::SessionError;

/// Maximum number of participants in a session.
pub const MAX_PARTICIPANTS: usize = 2;

/// A connection admitted into a session, with its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub role: Role,
}

/// A single session.
///
/// Fields are private so the invariants below can only be changed
/// through [`admit`](Self::admit) and
/// [`remove_participant`](Self::remove_participant):
///
/// - `participants.len() <= MAX_PARTICIPANTS`
/// - the phase becomes `Active` exactly when the second participant is
///   admitted, and `Closed` exactly when the last one leaves
/// - the two roles are always distinct
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    phase: SessionPhase,
    participants: Vec<Participant>,
    auxiliary_state: Option<Vec<u8>>,
    created_seq: u64,
}

impl Session {
    /// Creates an empty session awaiting its participants.
    pub(crate) fn new(id: SessionId, created_seq: u64) -> Self {
        Self {
            id,
            phase: SessionPhase::AwaitingSecondParticipant,
            participants: Vec::with_capacity(MAX_PARTICIPANTS),
            auxiliary_state: None,
            created_seq,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Participants in join order; the first one created the session.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn player_count(&self) -> usize {
        self.participants.len()
    }

    pub(crate) fn created_seq(&self) -> u64 {
        self.created_seq
    }

    /// Returns `true` if another participant may still be admitted.
    pub fn is_joinable(&self) -> bool {
        self.phase.is_joinable() && self.participants.len() < MAX_PARTICIPANTS
    }

    pub fn is_participant(&self, connection_id: &ConnectionId) -> bool {
        self.role_of(connection_id).is_some()
    }

    /// Returns the role the connection plays here, if it is a participant.
    pub fn role_of(&self, connection_id: &ConnectionId) -> Option<Role> {
        self.participants
            .iter()
            .find(|p| &p.connection_id == connection_id)
            .map(|p| p.role)
    }

    /// Returns the participant that is not `connection_id`, if present.
    pub fn other_participant(
        &self,
        connection_id: &ConnectionId,
    ) -> Option<&ConnectionId> {
        self.participants
            .iter()
            .map(|p| &p.connection_id)
            .find(|c| *c != connection_id)
    }

    pub fn auxiliary_state(&self) -> Option<&[u8]> {
        self.auxiliary_state.as_deref()
    }

    /// Replaces the auxiliary state. The bytes are never interpreted.
    pub fn set_auxiliary_state(&mut self, state: Vec<u8>) {
        self.auxiliary_state = Some(state);
    }

    /// Admits a connection and returns the role it was assigned.
    ///
    /// The first participant gets [`Role::A`], the second [`Role::B`];
    /// admitting the second one moves the session to `Active`.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyInSession`] if the connection is already
    ///   a participant here
    /// - [`SessionError::SessionFull`] if the session is past its
    ///   joinable phase or has no free slot
    pub fn admit(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Role, SessionError> {
        if self.is_participant(&connection_id) {
            return Err(SessionError::AlreadyInSession(
                connection_id,
                self.id.clone(),
            ));
        }
        if !self.is_joinable() {
            return Err(SessionError::SessionFull(self.id.clone()));
        }

        let role = match self.participants.first() {
            None => Role::A,
            Some(first) => first.role.other(),
        };
        self.participants.push(Participant {
            connection_id,
            role,
        });

        if self.participants.len() == MAX_PARTICIPANTS {
            self.set_phase(SessionPhase::Active);
        }
        Ok(role)
    }

    /// Removes a participant. Returns `false` if it wasn't one.
    ///
    /// When the last participant leaves the session becomes `Closed`. A
    /// single remaining participant leaves an `Active` session orphaned:
    /// still `Active`, joinable by nobody.
    pub fn remove_participant(&mut self, connection_id: &ConnectionId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| &p.connection_id != connection_id);
        let removed = self.participants.len() != before;

        if removed && self.participants.is_empty() {
            self.set_phase(SessionPhase::Closed);
        }
        removed
    }

    fn set_phase(&mut self, to: SessionPhase) {
        debug_assert!(
            self.phase.can_transition_to(to),
            "illegal phase change {} -> {to} for {}",
            self.phase,
            self.id
        );
        self.phase = to;
    }

    /// Returns this session's line in the lobby directory.
    pub fn directory_entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            game_id: self.id.clone(),
            players: self.participants.len(),
            joinable: self.is_joinable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn session() -> Session {
        Session::new(SessionId::from("g1"), 0)
    }

    #[test]
    fn test_new_session_awaits_participants() {
        let s = session();
        assert_eq!(s.phase(), SessionPhase::AwaitingSecondParticipant);
        assert_eq!(s.player_count(), 0);
        assert!(s.is_joinable());
        assert!(s.auxiliary_state().is_none());
    }

    #[test]
    fn test_admit_assigns_a_then_b_and_activates() {
        let mut s = session();

        assert_eq!(s.admit(conn("c1")).unwrap(), Role::A);
        assert_eq!(s.phase(), SessionPhase::AwaitingSecondParticipant);

        assert_eq!(s.admit(conn("c2")).unwrap(), Role::B);
        assert_eq!(s.phase(), SessionPhase::Active);
        assert_eq!(s.role_of(&conn("c1")), Some(Role::A));
        assert_eq!(s.role_of(&conn("c2")), Some(Role::B));
        assert!(!s.is_joinable());
    }

    #[test]
    fn test_admit_third_participant_is_full() {
        let mut s = session();
        s.admit(conn("c1")).unwrap();
        s.admit(conn("c2")).unwrap();

        let err = s.admit(conn("c3")).unwrap_err();
        assert_eq!(err, SessionError::SessionFull(SessionId::from("g1")));
        assert_eq!(s.player_count(), 2);
    }

    #[test]
    fn test_admit_same_connection_twice_is_rejected() {
        let mut s = session();
        s.admit(conn("c1")).unwrap();

        let err = s.admit(conn("c1")).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyInSession(..)));
        assert_eq!(s.player_count(), 1);
    }

    #[test]
    fn test_other_participant() {
        let mut s = session();
        s.admit(conn("c1")).unwrap();
        assert_eq!(s.other_participant(&conn("c1")), None);

        s.admit(conn("c2")).unwrap();
        assert_eq!(s.other_participant(&conn("c1")), Some(&conn("c2")));
        assert_eq!(s.other_participant(&conn("c2")), Some(&conn("c1")));
    }

    #[test]
    fn test_remove_from_active_leaves_orphan_that_cannot_be_joined() {
        let mut s = session();
        s.admit(conn("c1")).unwrap();
        s.admit(conn("c2")).unwrap();

        assert!(s.remove_participant(&conn("c2")));
        assert_eq!(s.phase(), SessionPhase::Active);
        assert_eq!(s.player_count(), 1);
        assert!(!s.is_joinable());
        assert!(matches!(
            s.admit(conn("c3")),
            Err(SessionError::SessionFull(_))
        ));
    }

    #[test]
    fn test_remove_last_participant_closes() {
        let mut s = session();
        s.admit(conn("c1")).unwrap();

        assert!(s.remove_participant(&conn("c1")));
        assert_eq!(s.phase(), SessionPhase::Closed);
        assert!(!s.is_joinable());
    }

    #[test]
    fn test_remove_unknown_participant_is_noop() {
        let mut s = session();
        s.admit(conn("c1")).unwrap();

        assert!(!s.remove_participant(&conn("nobody")));
        assert_eq!(s.phase(), SessionPhase::AwaitingSecondParticipant);
        assert_eq!(s.player_count(), 1);
    }

    #[test]
    fn test_every_phase_change_is_a_legal_transition() {
        for leaver in ["c1", "c2"] {
            let mut s = session();
            let mut phases = vec![s.phase()];
            s.admit(conn("c1")).unwrap();
            phases.push(s.phase());
            s.admit(conn("c2")).unwrap();
            phases.push(s.phase());
            s.remove_participant(&conn(leaver));
            phases.push(s.phase());
            s.remove_participant(&conn(if leaver == "c1" { "c2" } else { "c1" }));
            phases.push(s.phase());

            phases.dedup();
            assert_eq!(phases, vec![
                SessionPhase::AwaitingSecondParticipant,
                SessionPhase::Active,
                SessionPhase::Closed,
            ]);
            for pair in phases.windows(2) {
                assert!(pair[0].can_transition_to(pair[1]), "{pair:?}");
            }
        }
    }

    #[test]
    fn test_auxiliary_state_is_stored_verbatim() {
        let mut s = session();
        s.set_auxiliary_state(vec![0, 159, 146, 150]);
        assert_eq!(s.auxiliary_state(), Some(&[0u8, 159, 146, 150][..]));
    }

    #[test]
    fn test_directory_entry() {
        let mut s = session();
        s.admit(conn("c1")).unwrap();
        let entry = s.directory_entry();
        assert_eq!(entry.game_id, SessionId::from("g1"));
        assert_eq!(entry.players, 1);
        assert!(entry.joinable);
    }
}
