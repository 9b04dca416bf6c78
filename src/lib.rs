pub mod chat;
pub mod res;

use axum::extract::FromRef;

use chat::registry::ConnectionRegistry;
use chat::store::ConversationStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub conversations: ConversationStore,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            conversations: ConversationStore::new(),
        }
    }
}
