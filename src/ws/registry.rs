use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::connctx::ConnectionId;

/// Result of a [`SessionRegistry::join`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinOutcome {
    /// Room the connection had to leave first, if any
    pub left: Option<String>,
    /// Whether the left room is now empty
    pub left_room_emptied: bool,
    /// False when the connection was already a member
    pub joined: bool,
}

#[derive(Default)]
struct Memberships {
    rooms: HashMap<String, HashSet<ConnectionId>>,
    room_of: HashMap<ConnectionId, String>,
}

impl Memberships {
    /// Remove `conn` from `room`; returns whether the room is now empty
    fn detach(&mut self, conn: &ConnectionId, room: &str) -> bool {
        let emptied = match self.rooms.get_mut(room) {
            Some(members) => {
                members.remove(conn);
                members.is_empty()
            }
            None => true,
        };
        if emptied {
            self.rooms.remove(room);
            debug!("Room {} is empty, discarding", room);
        }
        emptied
    }
}

/// Room token to member set, plus the inverse index.
///
/// Every operation is an in-memory no-op on stale input; nothing here fails.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Memberships>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `conn` in `room`, leaving its previous room first
    pub fn join(&self, conn: &ConnectionId, room: &str) -> JoinOutcome {
        let mut inner = self.inner.lock();
        let mut outcome = JoinOutcome::default();

        match inner.room_of.get(conn).cloned() {
            Some(current) if current == room => return outcome,
            Some(previous) => {
                outcome.left_room_emptied = inner.detach(conn, &previous);
                outcome.left = Some(previous);
            }
            None => {}
        }

        inner.rooms.entry(room.to_string()).or_default().insert(conn.clone());
        inner.room_of.insert(conn.clone(), room.to_string());
        outcome.joined = true;
        outcome
    }

    /// Take `conn` out of `room`. Returns `Some(emptied)` if it was a member.
    pub fn leave(&self, conn: &ConnectionId, room: &str) -> Option<bool> {
        let mut inner = self.inner.lock();
        if inner.room_of.get(conn).map(String::as_str) != Some(room) {
            return None;
        }
        inner.room_of.remove(conn);
        Some(inner.detach(conn, room))
    }

    /// Forget `conn` entirely. Returns the room it was in and whether that
    /// room is now empty.
    pub fn remove(&self, conn: &ConnectionId) -> Option<(String, bool)> {
        let mut inner = self.inner.lock();
        let room = inner.room_of.remove(conn)?;
        let emptied = inner.detach(conn, &room);
        Some((room, emptied))
    }

    /// Snapshot of the members of `room`
    pub fn members_of(&self, room: &str) -> Vec<ConnectionId> {
        self.inner
            .lock()
            .rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_of(&self, conn: &ConnectionId) -> Option<String> {
        self.inner.lock().room_of.get(conn).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<ConnectionId>) -> Vec<ConnectionId> {
        v.sort();
        v
    }

    #[test]
    fn join_is_idempotent() {
        let reg = SessionRegistry::new();
        let a = ConnectionId::from("a");

        assert!(reg.join(&a, "abc123").joined);
        let again = reg.join(&a, "abc123");
        assert!(!again.joined);
        assert_eq!(again.left, None);
        assert_eq!(reg.members_of("abc123"), vec![a.clone()]);
        assert_eq!(reg.room_of(&a).as_deref(), Some("abc123"));
    }

    #[test]
    fn joining_another_room_leaves_the_first() {
        let reg = SessionRegistry::new();
        let a = ConnectionId::from("a");
        let b = ConnectionId::from("b");
        reg.join(&a, "one");
        reg.join(&b, "one");

        let outcome = reg.join(&a, "two");
        assert_eq!(outcome.left.as_deref(), Some("one"));
        assert!(!outcome.left_room_emptied);
        assert!(outcome.joined);
        assert_eq!(reg.members_of("one"), vec![b.clone()]);
        assert_eq!(reg.members_of("two"), vec![a.clone()]);

        let outcome = reg.join(&b, "two");
        assert!(outcome.left_room_emptied);
        assert_eq!(reg.room_count(), 1);
    }

    #[test]
    fn leave_and_remove_are_noops_on_stale_state() {
        let reg = SessionRegistry::new();
        let a = ConnectionId::from("a");
        assert_eq!(reg.leave(&a, "abc123"), None);
        assert_eq!(reg.remove(&a), None);

        reg.join(&a, "abc123");
        assert_eq!(reg.leave(&a, "other"), None);
        assert_eq!(reg.members_of("abc123").len(), 1);

        assert_eq!(reg.leave(&a, "abc123"), Some(true));
        assert_eq!(reg.leave(&a, "abc123"), None);
        assert!(reg.members_of("abc123").is_empty());
        assert_eq!(reg.room_count(), 0);

        // A discarded room can be rejoined
        reg.join(&a, "abc123");
        assert_eq!(reg.members_of("abc123"), vec![a]);
    }

    #[test]
    fn membership_tracks_join_leave_sequences() {
        let reg = SessionRegistry::new();
        let conns: Vec<ConnectionId> = ["a", "b", "c", "d"].into_iter().map(ConnectionId::from).collect();
        let mut expected: Vec<ConnectionId> = Vec::new();

        // (connection index, join?)
        let script = [(0, true), (1, true), (0, true), (2, true), (1, false), (3, true), (1, false), (0, false), (1, true)];
        for (idx, join) in script {
            let conn = &conns[idx];
            if join {
                reg.join(conn, "room");
                if !expected.contains(conn) {
                    expected.push(conn.clone());
                }
            } else {
                reg.leave(conn, "room");
                expected.retain(|c| c != conn);
            }
            assert_eq!(sorted(reg.members_of("room")), sorted(expected.clone()));
        }
    }

    #[test]
    fn remove_reports_room_and_emptiness() {
        let reg = SessionRegistry::new();
        let a = ConnectionId::from("a");
        let b = ConnectionId::from("b");
        reg.join(&a, "abc123");
        reg.join(&b, "abc123");

        assert_eq!(reg.remove(&a), Some(("abc123".to_string(), false)));
        assert_eq!(reg.remove(&b), Some(("abc123".to_string(), true)));
        assert_eq!(reg.room_of(&a), None);
    }
}
