use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use robot_arena_server::config::ServerConfig;
use robot_arena_server::engine::ArenaEngine;
use robot_arena_server::ranking::build_response;
use robot_arena_server::server_protocol::parse_command;
use robot_arena_server::server_utils::{normalize_new_robot, parse_ranking_limit};
use robot_arena_server::timer::{TickToken, TokioTickDriver};
use robot_arena_server::types::NewRobot;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type SharedEngine = Arc<Mutex<ArenaEngine>>;

#[derive(Debug, Deserialize)]
struct RankingQuery {
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultRequest {
    #[serde(rename = "scoreA")]
    score_a: u32,
    #[serde(rename = "scoreB")]
    score_b: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();
    let driver = TokioTickDriver::new(config.tick_period(), tick_tx);
    let engine = Arc::new(Mutex::new(ArenaEngine::new(
        config.engine_options(),
        rand::random(),
        Box::new(driver),
    )));
    start_tick_pump(engine.clone(), tick_rx);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/state", get(state_handler))
        .route("/api/ranking", get(ranking_handler))
        .route("/api/robots", post(register_robot_handler))
        .route("/api/tournament/generate", post(generate_handler))
        .route("/api/matches/{match_id}/result", post(result_handler))
        .route("/api/reset", post(reset_handler))
        .route("/ws", get(ws_handler))
        .with_state(engine);

    let app = if let Some(static_dir) = resolve_static_dir(config.static_dir.clone()) {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        app
    };

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(%bind_addr, tick_ms = config.tick_ms, "arena server listening");
    axum::serve(listener, app)
        .await
        .context("server runtime failed")?;
    Ok(())
}

fn resolve_static_dir(configured: Option<PathBuf>) -> Option<PathBuf> {
    let path = configured?;
    if path.join("index.html").is_file() {
        return Some(path);
    }
    warn!(root = %path.display(), "static dir has no index.html, not serving it");
    None
}

/// Feeds timer ticks into the engine one at a time, under the same lock as
/// every other mutation.
fn start_tick_pump(engine: SharedEngine, mut ticks: mpsc::UnboundedReceiver<TickToken>) {
    tokio::spawn(async move {
        while let Some(token) = ticks.recv().await {
            let mut guard = engine.lock().await;
            guard.handle_tick(token);
        }
    });
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn state_handler(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let guard = engine.lock().await;
    Json(guard.snapshot())
}

async fn ranking_handler(
    State(engine): State<SharedEngine>,
    Query(query): Query<RankingQuery>,
) -> impl IntoResponse {
    let guard = engine.lock().await;
    Json(build_response(
        &guard.state().ranking,
        parse_ranking_limit(query.limit.as_deref()),
    ))
}

async fn register_robot_handler(
    State(engine): State<SharedEngine>,
    Json(input): Json<NewRobot>,
) -> impl IntoResponse {
    let mut guard = engine.lock().await;
    Json(guard.register_robot(normalize_new_robot(input)))
}

async fn generate_handler(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let mut guard = engine.lock().await;
    guard.generate_tournament();
    Json(guard.snapshot())
}

async fn result_handler(
    State(engine): State<SharedEngine>,
    Path(match_id): Path<String>,
    Json(result): Json<ResultRequest>,
) -> impl IntoResponse {
    let mut guard = engine.lock().await;
    guard.finalize_match(&match_id, result.score_a, result.score_b);
    Json(guard.snapshot())
}

async fn reset_handler(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let mut guard = engine.lock().await;
    guard.reset();
    Json(guard.snapshot())
}

async fn ws_handler(ws: WebSocketUpgrade, State(engine): State<SharedEngine>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(engine, socket))
}

async fn handle_socket(engine: SharedEngine, socket: WebSocket) {
    let subscription = engine.lock().await.subscribe();
    let subscriber_id = subscription.id;
    let mut notifications = subscription.rx;

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = notifications.recv().await {
            if ws_sender
                .send(Message::Text(payload.as_ref().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&engine, subscriber_id, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = std::str::from_utf8(&raw) {
                    handle_client_message(&engine, subscriber_id, text).await;
                } else {
                    debug!(subscriber = subscriber_id, "dropping non-utf8 frame");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    engine.lock().await.unsubscribe(subscriber_id);
    writer.abort();
    let _ = writer.await;
}

async fn handle_client_message(engine: &SharedEngine, subscriber_id: u64, raw: &str) {
    match parse_command(raw) {
        Ok(command) => engine.lock().await.apply(command),
        Err(error) => debug!(subscriber = subscriber_id, %error, "dropping malformed command"),
    }
}
