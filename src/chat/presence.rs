use super::event::ServerEvent;
use super::registry::ConnectionRegistry;

/// Pushes the current roster to every live connection, registered or not.
/// Pure function of registry state at the instant of the call; invoked after
/// a successful registration, after each successful send, and after the
/// disconnect of a registered connection.
pub fn broadcast_roster(registry: &ConnectionRegistry) {
    registry.broadcast(ServerEvent::UserList(registry.snapshot()));
}
