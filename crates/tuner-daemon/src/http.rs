//! HTTP control API.
//!
//! Thin boundary for whatever front end drives the daemon: handlers only
//! read the state snapshot or enqueue a command for the event loop; they
//! never touch the station list themselves.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use tuner_core::directory::SearchMode;
use tuner_core::protocol::{AppState, Command, StationRecord};
use tuner_core::state::StateManager;

use crate::core::DaemonEvent;

#[derive(Clone)]
struct HttpState {
    state_manager: StateManager,
    event_tx: mpsc::Sender<DaemonEvent>,
}

#[derive(Deserialize)]
struct SearchBody {
    query: String,
    #[serde(default)]
    mode: SearchMode,
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: StateManager,
    event_tx: mpsc::Sender<DaemonEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app_state = HttpState {
            state_manager,
            event_tx,
        };

        let app = Router::new()
            .route("/api/state", get(get_state))
            .route("/api/play/:idx", get(play).post(play))
            .route("/api/stop", get(stop).post(stop))
            .route("/api/volume/:value", get(set_volume).post(set_volume))
            .route("/api/stations", post(add_station))
            .route("/api/stations/:idx", put(edit_station).delete(delete_station))
            .route("/api/search", post(search))
            .route("/api/search/add/:idx", post(add_from_search))
            .layer(CorsLayer::permissive())
            .with_state(app_state);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn send_command(state: &HttpState, cmd: Command) -> StatusCode {
    if state
        .event_tx
        .send(DaemonEvent::ClientCommand(cmd))
        .await
        .is_err()
    {
        error!("Failed to queue command: event loop gone");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::ACCEPTED
}

async fn get_state(State(state): State<HttpState>) -> Json<AppState> {
    Json(state.state_manager.get_state().await)
}

async fn play(State(state): State<HttpState>, Path(idx): Path<usize>) -> StatusCode {
    info!("HTTP API: play station {}", idx);
    send_command(&state, Command::Play { index: idx }).await
}

async fn stop(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: stop");
    send_command(&state, Command::Stop).await
}

async fn set_volume(State(state): State<HttpState>, Path(value): Path<u8>) -> StatusCode {
    info!("HTTP API: set volume to {}", value);
    send_command(&state, Command::SetVolume { value }).await
}

async fn add_station(
    State(state): State<HttpState>,
    Json(record): Json<StationRecord>,
) -> StatusCode {
    info!("HTTP API: add station '{}'", record.name);
    send_command(&state, Command::AddStation { record }).await
}

async fn edit_station(
    State(state): State<HttpState>,
    Path(idx): Path<usize>,
    Json(record): Json<StationRecord>,
) -> StatusCode {
    info!("HTTP API: edit station {}", idx);
    send_command(&state, Command::EditStation { index: idx, record }).await
}

async fn delete_station(State(state): State<HttpState>, Path(idx): Path<usize>) -> StatusCode {
    info!("HTTP API: delete station {}", idx);
    send_command(&state, Command::DeleteStation { index: idx }).await
}

async fn search(State(state): State<HttpState>, Json(body): Json<SearchBody>) -> StatusCode {
    info!("HTTP API: search '{}'", body.query);
    send_command(
        &state,
        Command::Search {
            query: body.query,
            mode: body.mode,
        },
    )
    .await
}

async fn add_from_search(State(state): State<HttpState>, Path(idx): Path<usize>) -> StatusCode {
    info!("HTTP API: add search result {}", idx);
    send_command(&state, Command::AddFromSearch { index: idx }).await
}
