//! Shared state snapshot
//!
//! The event loop is the only writer; HTTP handlers read.  Every setter
//! bumps the `rev` counter so clients can detect missed updates.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::directory::SearchResult;
use crate::protocol::{AppState, StationRecord};

#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<AppState>>,
}

impl StateManager {
    pub fn new(stations: Vec<StationRecord>, volume: u8) -> Self {
        let state = AppState {
            rev: 1,
            stations,
            volume: volume.min(100),
            ..AppState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn get_state(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn set_stations(&self, stations: Vec<StationRecord>) {
        let mut state = self.state.write().await;
        state.stations = stations;
        state.last_error = None;
        state.rev += 1;
    }

    pub async fn set_playing(&self, index: usize, url: String) {
        let mut state = self.state.write().await;
        state.current_station = Some(index);
        state.playing_url = Some(url);
        state.is_playing = true;
        state.rev += 1;
    }

    pub async fn set_stopped(&self) {
        let mut state = self.state.write().await;
        state.current_station = None;
        state.playing_url = None;
        state.is_playing = false;
        state.rev += 1;
    }

    pub async fn set_volume(&self, volume: u8) {
        let mut state = self.state.write().await;
        state.volume = volume.min(100);
        state.rev += 1;
    }

    pub async fn set_searching(&self, searching: bool) {
        let mut state = self.state.write().await;
        state.searching = searching;
        state.rev += 1;
    }

    /// Publish the latest completed search; also clears `searching`.
    pub async fn set_search_results(&self, results: Vec<SearchResult>) {
        let mut state = self.state.write().await;
        state.search_results = results;
        state.searching = false;
        state.rev += 1;
    }

    pub async fn set_add_in_flight(&self, add_in_flight: bool) {
        let mut state = self.state.write().await;
        state.add_in_flight = add_in_flight;
        state.rev += 1;
    }

    pub async fn set_last_error(&self, message: String) {
        let mut state = self.state.write().await;
        state.last_error = Some(message);
        state.rev += 1;
    }
}
