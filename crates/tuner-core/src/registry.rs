//! Station registry
//!
//! Ordered, in-memory station list with save-on-write persistence.  Owned
//! by the daemon event loop; every mutation validates, applies, and writes
//! the whole list back as pretty-printed JSON.  A failed write rolls the
//! in-memory change back, so memory and disk never silently diverge.

use std::path::PathBuf;

use tracing::warn;

use crate::error::RegistryError;
use crate::protocol::StationRecord;

pub struct StationRegistry {
    path: PathBuf,
    stations: Vec<StationRecord>,
}

impl StationRegistry {
    /// Load the station list from `path`.  A missing file is an empty
    /// list; an unreadable one is logged and treated the same.
    pub fn load(path: PathBuf) -> Self {
        let stations = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(stations) => stations,
                Err(err) => {
                    warn!(path = ?path, error = %err, "stations file unreadable, starting empty");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                warn!(path = ?path, error = %err, "stations file unreadable, starting empty");
                Vec::new()
            }
        };
        Self { path, stations }
    }

    pub fn stations(&self) -> &[StationRecord] {
        &self.stations
    }

    pub fn get(&self, index: usize) -> Option<&StationRecord> {
        self.stations.get(index)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Append a station and persist.
    pub fn add(&mut self, record: StationRecord) -> Result<(), RegistryError> {
        validate(&record)?;
        self.stations.push(record);
        if let Err(err) = self.save() {
            self.stations.pop();
            return Err(err);
        }
        Ok(())
    }

    /// Replace the station at `index` and persist.
    pub fn edit(&mut self, index: usize, record: StationRecord) -> Result<(), RegistryError> {
        if index >= self.stations.len() {
            return Err(RegistryError::InvalidIndex(index));
        }
        validate(&record)?;
        let previous = std::mem::replace(&mut self.stations[index], record);
        if let Err(err) = self.save() {
            self.stations[index] = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Remove the station at `index`, persist, and return the removed
    /// record so the caller can reconcile playback state against it.
    pub fn delete(&mut self, index: usize) -> Result<StationRecord, RegistryError> {
        if index >= self.stations.len() {
            return Err(RegistryError::InvalidIndex(index));
        }
        let removed = self.stations.remove(index);
        if let Err(err) = self.save() {
            self.stations.insert(index, removed);
            return Err(err);
        }
        Ok(removed)
    }

    /// Write the whole list to disk as pretty-printed JSON.
    pub fn save(&self) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.stations)
            .map_err(|err| RegistryError::Persistence(std::io::Error::other(err)))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn validate(record: &StationRecord) -> Result<(), RegistryError> {
    if record.name.trim().is_empty() || record.url.trim().is_empty() {
        return Err(RegistryError::Validation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str, url: &str) -> StationRecord {
        StationRecord::new(name, "", url)
    }

    #[test]
    fn add_save_reload_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.json");

        let mut registry = StationRegistry::load(path.clone());
        registry.add(record("First", "http://a.example/stream")).unwrap();
        registry
            .add(StationRecord::new("Second", "jazz, late night", "http://b.example/stream"))
            .unwrap();

        let reloaded = StationRegistry::load(path);
        assert_eq!(reloaded.stations(), registry.stations());
        assert_eq!(reloaded.get(0).unwrap().name, "First");
        assert_eq!(reloaded.get(1).unwrap().info, "jazz, late night");
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let registry = StationRegistry::load(dir.path().join("nope.json"));
        assert!(registry.is_empty());
    }

    #[test]
    fn garbage_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(&path, "not json at all").unwrap();
        let registry = StationRegistry::load(path);
        assert!(registry.is_empty());
    }

    #[test]
    fn add_rejects_blank_name_and_url() {
        let dir = tempdir().unwrap();
        let mut registry = StationRegistry::load(dir.path().join("stations.json"));

        assert!(matches!(
            registry.add(record("  ", "http://a.example/stream")),
            Err(RegistryError::Validation)
        ));
        assert!(matches!(
            registry.add(record("Name", "")),
            Err(RegistryError::Validation)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn edit_out_of_bounds_is_invalid_index() {
        let dir = tempdir().unwrap();
        let mut registry = StationRegistry::load(dir.path().join("stations.json"));
        assert!(matches!(
            registry.edit(0, record("X", "http://x.example")),
            Err(RegistryError::InvalidIndex(0))
        ));
    }

    #[test]
    fn rejected_edit_leaves_sequence_unchanged() {
        let dir = tempdir().unwrap();
        let mut registry = StationRegistry::load(dir.path().join("stations.json"));
        registry.add(record("Keep", "http://keep.example/stream")).unwrap();

        assert!(matches!(
            registry.edit(0, record("", "http://new.example/stream")),
            Err(RegistryError::Validation)
        ));
        assert_eq!(registry.get(0).unwrap().name, "Keep");
        assert_eq!(registry.get(0).unwrap().url, "http://keep.example/stream");
    }

    #[test]
    fn edit_replaces_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.json");
        let mut registry = StationRegistry::load(path.clone());
        registry.add(record("Old", "http://old.example/stream")).unwrap();
        registry.add(record("Other", "http://other.example/stream")).unwrap();

        registry.edit(0, record("New", "http://new.example/stream")).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap().name, "New");

        let reloaded = StationRegistry::load(path);
        assert_eq!(reloaded.get(0).unwrap().name, "New");
        assert_eq!(reloaded.get(1).unwrap().name, "Other");
    }

    #[test]
    fn delete_returns_removed_record_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.json");
        let mut registry = StationRegistry::load(path.clone());
        registry.add(record("A", "http://a.example/stream")).unwrap();
        registry.add(record("B", "http://b.example/stream")).unwrap();

        let removed = registry.delete(0).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(registry.len(), 1);

        let reloaded = StationRegistry::load(path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(0).unwrap().name, "B");
    }

    #[test]
    fn delete_out_of_bounds_is_invalid_index() {
        let dir = tempdir().unwrap();
        let mut registry = StationRegistry::load(dir.path().join("stations.json"));
        registry.add(record("A", "http://a.example/stream")).unwrap();
        assert!(matches!(
            registry.delete(3),
            Err(RegistryError::InvalidIndex(3))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failed_save_rolls_back_the_mutation() {
        let dir = tempdir().unwrap();
        // a directory at the stations path makes every write fail
        let path = dir.path().join("stations.json");
        std::fs::create_dir(&path).unwrap();

        let mut registry = StationRegistry::load(path);
        assert!(matches!(
            registry.add(record("A", "http://a.example/stream")),
            Err(RegistryError::Persistence(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn saved_file_is_pretty_printed_with_stable_field_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.json");
        let mut registry = StationRegistry::load(path.clone());
        registry
            .add(StationRecord::new("A", "info text", "http://a.example/stream"))
            .unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains('\n'), "expected pretty-printed output");
        let name_at = written.find("\"name\"").unwrap();
        let info_at = written.find("\"info\"").unwrap();
        let url_at = written.find("\"url\"").unwrap();
        assert!(name_at < info_at && info_at < url_at);
    }
}
