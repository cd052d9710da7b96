use serde::{Deserialize, Serialize};

use crate::directory::{SearchMode, SearchResult};

/// A saved station.  Serialized to `stations.json` with exactly this field
/// order.  Identity is positional: callers address stations by their index
/// in the list and must re-derive it after any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    pub name: String,
    #[serde(default)]
    pub info: String,
    pub url: String,
}

impl StationRecord {
    pub fn new(
        name: impl Into<String>,
        info: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            info: info.into(),
            url: url.into(),
        }
    }
}

/// Commands sent into the daemon event loop.  All of them are applied by
/// the single event-loop consumer; handlers only enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    Play {
        index: usize,
    },
    Stop,
    SetVolume {
        value: u8,
    },
    Search {
        query: String,
        #[serde(default)]
        mode: SearchMode,
    },
    AddStation {
        record: StationRecord,
    },
    EditStation {
        index: usize,
        record: StationRecord,
    },
    DeleteStation {
        index: usize,
    },
    AddFromSearch {
        index: usize,
    },
}

/// Snapshot of the daemon state.  `rev` is a monotonically increasing
/// counter incremented on every change, so clients can detect missed
/// updates and resync.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppState {
    /// Monotonic revision counter — incremented on every state change.
    #[serde(default)]
    pub rev: u64,
    pub stations: Vec<StationRecord>,
    pub current_station: Option<usize>,
    pub playing_url: Option<String>,
    pub is_playing: bool,
    pub volume: u8,
    /// True while a directory search is in flight.
    pub searching: bool,
    /// Results of the latest completed search; superseded wholesale by the
    /// next one.
    pub search_results: Vec<SearchResult>,
    /// True while a resolve-and-add task is in flight; further
    /// add-from-search commands are rejected until it completes.
    pub add_in_flight: bool,
    /// Most recent registry failure, cleared by the next successful
    /// mutation.
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trip() {
        let cmd = Command::Play { index: 5 };
        let json = serde_json::to_string(&cmd).unwrap();
        match serde_json::from_str(&json).unwrap() {
            Command::Play { index } => assert_eq!(index, 5),
            other => panic!("wrong command decoded: {:?}", other),
        }
    }

    #[test]
    fn test_search_mode_defaults_to_name() {
        let cmd: Command = serde_json::from_str(r#"{"cmd":"Search","query":"jazz"}"#).unwrap();
        match cmd {
            Command::Search { query, mode } => {
                assert_eq!(query, "jazz");
                assert_eq!(mode, SearchMode::Name);
            }
            other => panic!("wrong command decoded: {:?}", other),
        }
    }

    #[test]
    fn test_station_record_info_defaults_empty() {
        let record: StationRecord =
            serde_json::from_str(r#"{"name":"KEXP","url":"http://kexp.example/stream"}"#).unwrap();
        assert_eq!(record.info, "");
    }
}
