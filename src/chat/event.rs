use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::store::Message;

/// One frame per client action. Connect and disconnect are socket-level,
/// not frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    RegisterUsername { username: String },
    SendPrivateMessage { recipient: String, message: String },
    GetHistory { other_user: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Error(String),
    UserList(Vec<RosterEntry>),
    NewMessage(Message),
    History(Vec<Message>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}
