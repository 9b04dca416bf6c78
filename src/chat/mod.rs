pub mod error;
pub mod event;
pub mod handlers;
pub mod presence;
pub mod registry;
pub mod store;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
}
