use axum::{debug_handler, extract::{State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::event::ClientEvent;
use super::handlers;
use super::registry::ConnectionRegistry;
use super::store::ConversationStore;

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    State(registry): State<ConnectionRegistry>,
    State(conversations): State<ConversationStore>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |stream| {
        let conn_id = Uuid::now_v7();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.connect(conn_id, tx);
        debug!(%conn_id, "connected");

        let (mut sender, mut receiver) = stream.split();

        let mut emit_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue
                };
                if sender.send(text.into()).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(msg)) = receiver.next().await {
            let Ok(event) = serde_json::from_slice::<ClientEvent>(&msg.into_data()) else {
                debug!(%conn_id, "skipping malformed frame");
                continue
            };

            handlers::dispatch(&registry, &conversations, conn_id, event);
        }

        // Removing the registry entry drops our sender; the emit task ends
        // once it has flushed whatever was already queued.
        handlers::handle_disconnect(&registry, conn_id);

        tokio::select! {
            _ = &mut emit_task => emit_task.abort(),
        };
    })
}
