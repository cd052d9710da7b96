//! Daemon event loop.
//!
//! All external inputs funnel into one mpsc channel consumed by
//! `DaemonCore::run`.  The loop is the only thing that touches the station
//! registry, the player handle, and the state snapshot; background tasks
//! (directory search, resolve-and-add) compute a result and hand it back
//! as an event.  That single-writer discipline is what makes station-list
//! mutations race-free without locks.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tuner_core::config::Config;
use tuner_core::directory::{DirectoryClient, SearchMode, SearchResult};
use tuner_core::error::DirectoryError;
use tuner_core::protocol::{Command, StationRecord};
use tuner_core::registry::StationRegistry;
use tuner_core::resolver;
use tuner_core::state::StateManager;

use crate::mpv::{MpvPlayer, Player};

const USER_AGENT: &str = concat!("tunerd/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub enum DaemonEvent {
    ClientCommand(Command),
    /// A directory search task finished.  `seq` identifies which request;
    /// only the latest issued one is applied.
    SearchFinished {
        seq: u64,
        outcome: Result<Vec<SearchResult>, DirectoryError>,
    },
    /// A resolve-and-add task finished.  Always sent, success or not, so
    /// the re-entrancy guard is guaranteed to be released.
    AddFinished { record: StationRecord },
}

pub struct DaemonCore<P: Player> {
    registry: StationRegistry,
    state: StateManager,
    directory: DirectoryClient,
    http_client: reqwest::Client,
    resolve_timeout: Duration,
    player: P,
    playing_url: Option<String>,
    event_tx: mpsc::Sender<DaemonEvent>,
    /// Sequence number of the latest issued search.
    search_seq: u64,
    /// Latest completed search, kept for add-from-search index lookups.
    search_results: Vec<SearchResult>,
    /// True while a resolve-and-add task is in flight.
    add_in_flight: bool,
}

impl DaemonCore<MpvPlayer> {
    pub fn new(config: &Config, event_tx: mpsc::Sender<DaemonEvent>) -> anyhow::Result<Self> {
        let player = MpvPlayer::new(config.player.default_volume);
        Self::with_player(config, player, event_tx)
    }
}

impl<P: Player> DaemonCore<P> {
    pub fn with_player(
        config: &Config,
        player: P,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> anyhow::Result<Self> {
        let registry = StationRegistry::load(config.stations.file.clone());
        info!(count = registry.len(), "station list loaded");

        let state = StateManager::new(registry.stations().to_vec(), config.player.default_volume);
        let http_client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let directory = DirectoryClient::new(
            http_client.clone(),
            config.directory.base_url.clone(),
            config.directory.limit,
            config.network.search_timeout(),
        );

        Ok(Self {
            registry,
            state,
            directory,
            http_client,
            resolve_timeout: config.network.resolve_timeout(),
            player,
            playing_url: None,
            event_tx,
            search_seq: 0,
            search_results: Vec::new(),
            add_in_flight: false,
        })
    }

    pub fn state_manager(&self) -> StateManager {
        self.state.clone()
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<DaemonEvent>) {
        while let Some(event) = event_rx.recv().await {
            self.handle_event(event).await;
        }
        info!("event channel closed, shutting down");
    }

    async fn handle_event(&mut self, event: DaemonEvent) {
        match event {
            DaemonEvent::ClientCommand(cmd) => self.handle_command(cmd).await,
            DaemonEvent::SearchFinished { seq, outcome } => {
                self.apply_search_finished(seq, outcome).await
            }
            DaemonEvent::AddFinished { record } => self.apply_add_finished(record).await,
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Play { index } => self.play(index).await,
            Command::Stop => self.stop().await,
            Command::SetVolume { value } => self.set_volume(value).await,
            Command::Search { query, mode } => self.start_search(query, mode).await,
            Command::AddStation { record } => self.apply_registry(|r| r.add(record)).await,
            Command::EditStation { index, record } => {
                self.apply_registry(|r| r.edit(index, record)).await
            }
            Command::DeleteStation { index } => self.delete_station(index).await,
            Command::AddFromSearch { index } => self.start_add_from_search(index).await,
        }
    }

    // ── playback ──────────────────────────────────────────────────────────

    async fn play(&mut self, index: usize) {
        let Some(record) = self.registry.get(index) else {
            warn!(index, "play command for out-of-bounds station index");
            return;
        };
        let (name, url) = (record.name.clone(), record.url.clone());

        info!(%name, %url, "playing station");
        if let Err(err) = self.player.play(&url).await {
            warn!(error = %err, "player failed to start");
            return;
        }
        self.playing_url = Some(url.clone());
        self.state.set_playing(index, url).await;
    }

    async fn stop(&mut self) {
        if let Err(err) = self.player.stop().await {
            warn!(error = %err, "player failed to stop");
        }
        self.playing_url = None;
        self.state.set_stopped().await;
    }

    async fn set_volume(&mut self, value: u8) {
        let value = value.min(100);
        if let Err(err) = self.player.set_volume(value).await {
            warn!(error = %err, "player rejected volume change");
        }
        self.state.set_volume(value).await;
    }

    // ── station registry ──────────────────────────────────────────────────

    async fn apply_registry(
        &mut self,
        op: impl FnOnce(&mut StationRegistry) -> Result<(), tuner_core::error::RegistryError>,
    ) {
        match op(&mut self.registry) {
            Ok(()) => {
                self.state.set_stations(self.registry.stations().to_vec()).await;
            }
            Err(err) => {
                warn!(error = %err, "registry operation rejected");
                self.state.set_last_error(err.to_string()).await;
            }
        }
    }

    async fn delete_station(&mut self, index: usize) {
        // stop first when the station being removed is the one playing
        let deleting_playing = match (self.registry.get(index), &self.playing_url) {
            (Some(record), Some(playing)) => record.url == *playing,
            _ => false,
        };
        if deleting_playing {
            info!(index, "deleting the station currently playing, stopping playback");
            self.stop().await;
        }

        self.apply_registry(|r| r.delete(index).map(|_| ())).await;
    }

    // ── directory search ──────────────────────────────────────────────────

    async fn start_search(&mut self, query: String, mode: SearchMode) {
        self.search_seq += 1;
        let seq = self.search_seq;
        self.state.set_searching(true).await;

        info!(seq, %query, ?mode, "starting directory search");
        let directory = self.directory.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = directory.search(&query, mode).await;
            let _ = tx.send(DaemonEvent::SearchFinished { seq, outcome }).await;
        });
    }

    async fn apply_search_finished(
        &mut self,
        seq: u64,
        outcome: Result<Vec<SearchResult>, DirectoryError>,
    ) {
        if seq != self.search_seq {
            debug!(seq, latest = self.search_seq, "discarding stale search completion");
            return;
        }
        match outcome {
            Ok(results) => {
                info!(seq, count = results.len(), "search finished");
                self.search_results = results.clone();
                self.state.set_search_results(results).await;
            }
            Err(err) => {
                warn!(seq, error = %err, "search failed");
                self.search_results.clear();
                self.state.set_search_results(Vec::new()).await;
            }
        }
    }

    // ── add from search (resolve in background) ───────────────────────────

    async fn start_add_from_search(&mut self, index: usize) {
        if self.add_in_flight {
            warn!("add-from-search already in progress, ignoring");
            return;
        }
        let Some(result) = self.search_results.get(index).cloned() else {
            warn!(index, "add-from-search index out of bounds");
            return;
        };

        self.add_in_flight = true;
        self.state.set_add_in_flight(true).await;

        let client = self.http_client.clone();
        let timeout = self.resolve_timeout;
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let url = result.stream_url().to_string();
            let resolved = resolver::resolve(&client, &url, timeout).await;
            let record = result.into_station(resolved);
            // resolution is total, so this send happens on every path and
            // the in-flight guard always gets released
            let _ = tx.send(DaemonEvent::AddFinished { record }).await;
        });
    }

    async fn apply_add_finished(&mut self, record: StationRecord) {
        info!(name = %record.name, url = %record.url, "adding resolved station");
        self.apply_registry(|r| r.add(record)).await;

        // releasing the guard is the last action, success or failure
        self.add_in_flight = false;
        self.state.set_add_in_flight(false).await;
    }
}
