use axum::{
    Router,
    extract::Extension,
    http::{
        StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use roomvote::config::Config;
use roomvote::db::{PgRoomStore, connection};
use roomvote::identity::IdentityResolver;
use roomvote::rooms;
use roomvote::sse;
use roomvote::startup::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("Invalid configuration");

    let pool = connection::init_db(&config.database_url)
        .await
        .expect("Unable to connect to database");
    let store = Arc::new(PgRoomStore::new(pool));

    let app_state = AppState::new(
        store,
        IdentityResolver::new(&config.jwt_secret),
        config.event_buffer,
        config.sweep_interval,
    );

    // build our application with a route
    let app = Router::new()
        .route(
            "/api/rooms",
            get(rooms::list_rooms).post(rooms::create_room),
        )
        .route("/api/rooms/events", get(sse::lobby_events))
        .route("/api/rooms/:unique_id", get(rooms::get_room))
        .route("/api/rooms/:unique_id/vote", post(rooms::submit_vote))
        .route("/api/rooms/:unique_id/events", get(sse::room_events))
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    axum::http::Method::POST,
                    axum::http::Method::GET,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT, AUTHORIZATION]),
        )
        .fallback(handler_404);

    info!("listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Unable to spawn tcp listener");

    axum::serve(listener, app).await.unwrap();
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
