use time::OffsetDateTime;
use tracing::{debug, info};

use super::error::ChatError;
use super::event::{ClientEvent, ServerEvent};
use super::presence;
use super::registry::{ConnId, ConnectionRegistry};
use super::store::{ConversationStore, Message};

/// Total match over the inbound event set.
pub fn dispatch(
    registry: &ConnectionRegistry,
    conversations: &ConversationStore,
    conn_id: ConnId,
    event: ClientEvent,
) {
    match event {
        ClientEvent::RegisterUsername { username } => {
            handle_register(registry, conn_id, username)
        }
        ClientEvent::SendPrivateMessage { recipient, message } => {
            handle_send(registry, conversations, conn_id, recipient, message)
        }
        ClientEvent::GetHistory { other_user } => {
            handle_history(registry, conversations, conn_id, other_user)
        }
    }
}

pub fn handle_register(registry: &ConnectionRegistry, conn_id: ConnId, username: String) {
    match registry.register(conn_id, &username) {
        Ok(()) => {
            info!(%conn_id, %username, "registered");
            presence::broadcast_roster(registry);
        }
        Err(err) => registry.send_to(conn_id, ServerEvent::Error(err.to_string())),
    }
}

pub fn handle_send(
    registry: &ConnectionRegistry,
    conversations: &ConversationStore,
    conn_id: ConnId,
    recipient: String,
    body: String,
) {
    let Some(sender) = registry.username_of(conn_id) else {
        registry.send_to(conn_id, ServerEvent::Error(ChatError::NotRegistered.to_string()));
        return;
    };
    // An offline recipient looks exactly like an unknown one; nothing is
    // queued for later delivery.
    let Some(recipient_id) = registry.lookup(&recipient) else {
        registry.send_to(conn_id, ServerEvent::Error(ChatError::RecipientNotFound.to_string()));
        return;
    };

    let message = Message {
        username: sender.clone(),
        message: body,
        timestamp: OffsetDateTime::now_utc(),
        unread: conn_id != recipient_id,
        delivered: false,
    };
    // The append precedes both emits: a history request racing in behind
    // either new_message already sees this message.
    let index = conversations.append(&sender, &recipient, message.clone());

    registry.send_to(
        conn_id,
        ServerEvent::NewMessage(Message { unread: false, ..message.clone() }),
    );

    // Recipient was live at lookup time; if it vanished since, the emit is
    // dropped but the stored message stays delivered.
    conversations.mark_delivered(&sender, &recipient, index);
    registry.send_to(recipient_id, ServerEvent::NewMessage(Message { delivered: true, ..message }));
    registry.touch(recipient_id);

    presence::broadcast_roster(registry);
}

/// Read-only: delivered/unread are never revised by a history request.
pub fn handle_history(
    registry: &ConnectionRegistry,
    conversations: &ConversationStore,
    conn_id: ConnId,
    other_user: String,
) {
    let Some(username) = registry.username_of(conn_id) else {
        registry.send_to(conn_id, ServerEvent::Error(ChatError::NotRegistered.to_string()));
        return;
    };

    registry.send_to(
        conn_id,
        ServerEvent::History(conversations.history(&username, &other_user)),
    );
}

pub fn handle_disconnect(registry: &ConnectionRegistry, conn_id: ConnId) {
    let was_registered = registry.disconnect(conn_id);
    debug!(%conn_id, was_registered, "disconnected");
    if was_registered {
        presence::broadcast_roster(registry);
    }
}
