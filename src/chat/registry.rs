use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::ChatError;
use super::event::{RosterEntry, ServerEvent};

pub type ConnId = Uuid;

/// Sender half of a connection's outbound channel. Cloning it lets any part
/// of the system push events to that client.
pub type ConnectionSender = mpsc::UnboundedSender<ServerEvent>;

struct Connection {
    username: Option<String>,
    last_seen: OffsetDateTime,
    tx: ConnectionSender,
}

/// Live connection table. One lock around the whole map: register's
/// check-and-bind must not race another register for the same name.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<ConnId, Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn connect(&self, conn_id: ConnId, tx: ConnectionSender) {
        self.inner.lock().insert(conn_id, Connection {
            username: None,
            last_seen: OffsetDateTime::now_utc(),
            tx,
        });
    }

    /// Binds `username` to `conn_id` unless some other live connection holds
    /// it, and refreshes last-seen. Rebinding the same connection to a new
    /// name frees the old one.
    pub fn register(&self, conn_id: ConnId, username: &str) -> Result<(), ChatError> {
        let mut connections = self.inner.lock();

        let taken = connections
            .iter()
            .any(|(id, conn)| *id != conn_id && conn.username.as_deref() == Some(username));
        if taken {
            return Err(ChatError::UsernameTaken);
        }

        if let Some(conn) = connections.get_mut(&conn_id) {
            conn.username = Some(username.to_owned());
            conn.last_seen = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    /// Refreshes last-seen; silently ignored if the connection already
    /// disconnected.
    pub fn touch(&self, conn_id: ConnId) {
        if let Some(conn) = self.inner.lock().get_mut(&conn_id) {
            conn.last_seen = OffsetDateTime::now_utc();
        }
    }

    pub fn lookup(&self, username: &str) -> Option<ConnId> {
        self.inner
            .lock()
            .iter()
            .find_map(|(id, conn)| (conn.username.as_deref() == Some(username)).then_some(*id))
    }

    pub fn username_of(&self, conn_id: ConnId) -> Option<String> {
        self.inner.lock().get(&conn_id)?.username.clone()
    }

    /// Removes the entry, freeing its username for reuse immediately.
    /// Returns whether the connection had a registered username.
    pub fn disconnect(&self, conn_id: ConnId) -> bool {
        self.inner
            .lock()
            .remove(&conn_id)
            .is_some_and(|conn| conn.username.is_some())
    }

    /// Point-in-time roster of every connection with a bound username.
    /// Order is unspecified.
    pub fn snapshot(&self) -> Vec<RosterEntry> {
        self.inner
            .lock()
            .values()
            .filter_map(|conn| {
                conn.username.clone().map(|username| RosterEntry {
                    username,
                    last_seen: conn.last_seen,
                })
            })
            .collect()
    }

    /// Best-effort directed emit. The connection may have gone away between
    /// lookup and emission; a missing entry or closed channel is a no-op.
    pub fn send_to(&self, conn_id: ConnId, event: ServerEvent) {
        let tx = self.inner.lock().get(&conn_id).map(|conn| conn.tx.clone());
        if let Some(tx) = tx {
            let _ = tx.send(event);
        }
    }

    /// Emit to every live connection, registered or not. Senders are
    /// snapshotted under the lock and emitted outside it, so a connection
    /// disconnecting mid-broadcast just loses its copy.
    pub fn broadcast(&self, event: ServerEvent) {
        let senders: Vec<ConnectionSender> =
            self.inner.lock().values().map(|conn| conn.tx.clone()).collect();
        for tx in senders {
            let _ = tx.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(registry: &ConnectionRegistry) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::now_v7();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.connect(conn_id, tx);
        (conn_id, rx)
    }

    #[test]
    fn register_enforces_uniqueness() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = connect(&registry);
        let (second, _rx2) = connect(&registry);

        assert_eq!(registry.register(first, "alice"), Ok(()));
        assert_eq!(registry.register(second, "alice"), Err(ChatError::UsernameTaken));
        assert_eq!(registry.lookup("alice"), Some(first));
    }

    #[test]
    fn reregistering_own_name_is_allowed() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);

        assert_eq!(registry.register(conn, "alice"), Ok(()));
        assert_eq!(registry.register(conn, "alice"), Ok(()));
        assert_eq!(registry.lookup("alice"), Some(conn));
    }

    #[test]
    fn rebinding_frees_the_old_name() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);
        let (other, _rx2) = connect(&registry);

        registry.register(conn, "alice").unwrap();
        registry.register(conn, "bob").unwrap();

        assert_eq!(registry.lookup("bob"), Some(conn));
        assert_eq!(registry.register(other, "alice"), Ok(()));
    }

    #[test]
    fn username_freed_on_disconnect() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = connect(&registry);
        registry.register(first, "alice").unwrap();

        assert!(registry.disconnect(first));
        assert_eq!(registry.lookup("alice"), None);

        let (second, _rx2) = connect(&registry);
        assert_eq!(registry.register(second, "alice"), Ok(()));
        assert_eq!(registry.lookup("alice"), Some(second));
    }

    #[test]
    fn disconnect_reports_whether_registered() {
        let registry = ConnectionRegistry::new();
        let (unregistered, _rx1) = connect(&registry);
        let (registered, _rx2) = connect(&registry);
        registry.register(registered, "alice").unwrap();

        assert!(!registry.disconnect(unregistered));
        assert!(registry.disconnect(registered));
    }

    #[test]
    fn touch_after_disconnect_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);
        registry.register(conn, "alice").unwrap();
        registry.disconnect(conn);

        registry.touch(conn);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn snapshot_skips_unregistered_connections() {
        let registry = ConnectionRegistry::new();
        let (_lurker, _rx1) = connect(&registry);
        let (conn, _rx2) = connect(&registry);
        registry.register(conn, "alice").unwrap();

        let roster = registry.snapshot();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].username, "alice");
    }

    #[test]
    fn touch_refreshes_last_seen() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);
        registry.register(conn, "alice").unwrap();

        let before = registry.snapshot()[0].last_seen;
        registry.touch(conn);
        let after = registry.snapshot()[0].last_seen;
        assert!(after >= before);
    }

    #[test]
    fn send_to_missing_connection_is_a_noop() {
        let registry = ConnectionRegistry::new();
        registry.send_to(Uuid::now_v7(), ServerEvent::Error("nobody home".to_owned()));
    }

    #[test]
    fn broadcast_reaches_every_connection() {
        let registry = ConnectionRegistry::new();
        let (_lurker, mut lurker_rx) = connect(&registry);
        let (conn, mut rx) = connect(&registry);
        registry.register(conn, "alice").unwrap();

        registry.broadcast(ServerEvent::UserList(registry.snapshot()));

        assert!(matches!(lurker_rx.try_recv(), Ok(ServerEvent::UserList(_))));
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::UserList(_))));
    }

    #[test]
    fn concurrent_registers_admit_exactly_one() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = connect(&registry);
        let (second, _rx2) = connect(&registry);

        let a = {
            let registry = registry.clone();
            std::thread::spawn(move || registry.register(first, "alice"))
        };
        let b = {
            let registry = registry.clone();
            std::thread::spawn(move || registry.register(second, "alice"))
        };
        let outcomes = [a.join().unwrap(), b.join().unwrap()];

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes.iter().filter(|r| **r == Err(ChatError::UsernameTaken)).count(),
            1
        );
    }
}
