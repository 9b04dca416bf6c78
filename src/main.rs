use sottovoce::{AppState, chat, include_res};
use axum::{
    debug_handler, response::{Html, IntoResponse}, routing::get, Router
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sottovoce=debug")),
        )
        .init();

    let app_state = AppState::new();

    let app = Router::new()
        .route("/", get(chat_page))

        .nest("/chat", chat::router())

        .with_state(app_state)
        .layer(CorsLayer::permissive());

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[debug_handler]
async fn chat_page() -> impl IntoResponse {
    Html(include_res!(str, "/pages/chat.html"))
}
