use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use piper_arena::config::ArenaConfig;
use piper_arena::constants::{
    frame_interval_ms, ticks_for_turns, DEFAULT_FPS, DEFAULT_INNER_SIDE, DEFAULT_PIPERS_PER_TEAM,
    DEFAULT_RATS, TEAM_COUNT,
};
use piper_arena::engine::{GameEngine, GameEntrant};
use piper_arena::results::{GameResult, ResultStore};
use piper_arena::strategy;
use piper_arena::types::TelemetryFrame;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Strategy for the north, east, south and west team, in that order.
    #[arg(
        short,
        long,
        num_args = 4,
        value_names = ["NORTH", "EAST", "SOUTH", "WEST"],
        default_values = ["sweeper", "sweeper", "sweeper", "sweeper"]
    )]
    groups: Vec<String>,
    #[arg(short, long, default_value_t = DEFAULT_PIPERS_PER_TEAM)]
    pipers: usize,
    #[arg(short, long, default_value_t = DEFAULT_RATS)]
    rats: usize,
    /// Turn limit; every turn is ten ticks. Unlimited when omitted.
    #[arg(short, long)]
    turns: Option<u64>,
    #[arg(short, long, default_value_t = DEFAULT_INNER_SIDE)]
    side: f64,
    #[arg(long)]
    seed: Option<u32>,
    /// Ticks per second pushed to spectators.
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: f64,
    /// Append finished games to this CSV file and serve its standings.
    #[arg(long)]
    results: Option<PathBuf>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, mpsc::Sender<OutboundMessage>>,
    game: Option<GameEngine>,
    latest_frame: Option<TelemetryFrame>,
    result: Option<GameResult>,
    result_store: Option<ResultStore>,
}

impl ServerState {
    fn new(game: GameEngine, result_store: Option<ResultStore>) -> Self {
        Self {
            clients: HashMap::new(),
            game: Some(game),
            latest_frame: None,
            result: None,
            result_store,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping { t: f64 },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let Some(interval_ms) = frame_interval_ms(cli.fps) else {
        error!(fps = cli.fps, "fps must be finite and positive");
        std::process::exit(1);
    };

    let game = match build_game(&cli) {
        Ok(game) => game,
        Err(message) => {
            error!(%message, "error during setup");
            std::process::exit(1);
        }
    };
    let result_store = cli.results.clone().map(ResultStore::new);
    let state = Arc::new(Mutex::new(ServerState::new(game, result_store)));
    start_tick_loop(state.clone(), interval_ms);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/state", get(state_handler))
        .route("/api/standings", get(standings_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            error!(%bind_addr, %error, "failed to bind server socket");
            std::process::exit(1);
        }
    };

    info!(port, interval_ms, "listening");
    if let Err(error) = axum::serve(listener, app).await {
        error!(%error, "server runtime failed");
        std::process::exit(1);
    }
}

fn build_game(cli: &Cli) -> Result<GameEngine, String> {
    let config = ArenaConfig {
        inner_side: cli.side,
        pipers_per_team: cli.pipers,
        rats: cli.rats,
        turn_budget: cli.turns.map(ticks_for_turns),
        ..ArenaConfig::default()
    };
    let mut entrants = Vec::with_capacity(TEAM_COUNT);
    for name in &cli.groups {
        let player = strategy::by_name(name).ok_or_else(|| format!("unknown group {name:?}"))?;
        entrants.push(GameEntrant::new(name.clone(), player));
    }
    let entrants: [GameEntrant; TEAM_COUNT] = entrants
        .try_into()
        .map_err(|rest: Vec<GameEntrant>| format!("expected 4 groups, got {}", rest.len()))?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(seed, groups = ?cli.groups, "starting game");
    GameEngine::new(config, entrants, seed).map_err(|error| error.to_string())
}

fn resolve_static_dir() -> Option<PathBuf> {
    let raw = std::env::var("STATIC_DIR").ok()?;
    let path = PathBuf::from(raw);
    path.join("index.html").is_file().then_some(path)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn state_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(json!({
        "frame": guard.latest_frame,
        "result": guard.result,
    }))
}

async fn standings_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    let Some(store) = guard.result_store.as_ref() else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "no result file" })));
    };
    match store.standings() {
        Ok(standings) => (StatusCode::OK, Json(json!({ "standings": standings }))),
        Err(error) => {
            warn!(%error, "failed to read standings");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(client_id.clone(), tx.clone());
        let hello = json!({
            "type": "hello",
            "clientId": client_id,
            "frame": guard.latest_frame,
            "result": guard.result,
        });
        send_to_client(&mut guard, &client_id, &hello, QueuePolicy::DisconnectOnFull);
    }
    info!(%client_id, "spectator connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(OutboundMessage::Text(payload)) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        match message {
            Message::Text(raw) => handle_client_message(&state, &client_id, raw.as_str()).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.lock().await.clients.remove(&client_id);
    info!(%client_id, "spectator disconnected");
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let reply = match parse_client_message(raw) {
        Some(ClientMessage::Ping { t }) => json!({ "type": "pong", "t": t }),
        None => json!({ "type": "error", "message": "invalid message" }),
    };
    let mut guard = state.lock().await;
    send_to_client(&mut guard, client_id, &reply, QueuePolicy::DisconnectOnFull);
}

fn parse_client_message(raw: &str) -> Option<ClientMessage> {
    serde_json::from_str(raw).ok()
}

fn start_tick_loop(state: SharedState, interval_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    let Some(game) = state.game.as_mut() else {
        return;
    };
    let stepped = game.step();
    let frame = game.build_frame(true);
    let finished = match stepped {
        Ok(()) => game.is_ended().then(|| game.build_result()),
        Err(error) => {
            error!(%error, tick = frame.tick, "game aborted");
            Some(game.build_result())
        }
    };

    broadcast(
        state,
        &json!({ "type": "state", "frame": frame }),
        QueuePolicy::DropOnFull,
    );
    state.latest_frame = Some(frame);

    let Some(result) = finished else {
        return;
    };
    info!(winner = %result.winner, scores = ?result.scores, "game finished");
    if let Some(store) = state.result_store.as_ref() {
        if let Err(error) = store.append(&result) {
            error!(%error, "failed to record result");
        }
    }
    broadcast(
        state,
        &json!({ "type": "game_over", "result": result }),
        QueuePolicy::DisconnectOnFull,
    );
    state.result = Some(result);
    state.game = None;
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = state
        .clients
        .get(client_id)
        .map(|tx| tx.try_send(OutboundMessage::Text(message.to_string())).is_err())
        .unwrap_or(false);
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        state.clients.remove(client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, tx) in &state.clients {
        if tx.try_send(OutboundMessage::Text(payload.clone())).is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        warn!(%client_id, "dropping slow spectator");
        state.clients.remove(&client_id);
    }
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
