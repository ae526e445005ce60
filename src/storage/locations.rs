//! Location repository
//!
//! Manages loading and saving location configuration to locations.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::TillError;
use crate::models::{Location, LocationId};

use super::file_io::{read_json, write_json_atomic};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct LocationData {
    locations: Vec<Location>,
}

pub struct LocationRepository {
    path: PathBuf,
    data: RwLock<HashMap<LocationId, Location>>,
}

impl LocationRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), TillError> {
        let file_data: LocationData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| TillError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        data.extend(file_data.locations.into_iter().map(|l| (l.id, l)));
        Ok(())
    }

    pub fn save(&self) -> Result<(), TillError> {
        let data = self
            .data
            .read()
            .map_err(|e| TillError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut locations: Vec<_> = data.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        write_json_atomic(&self.path, &LocationData { locations })
    }

    pub fn get(&self, id: LocationId) -> Result<Option<Location>, TillError> {
        let data = self
            .data
            .read()
            .map_err(|e| TillError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get a location by name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Result<Option<Location>, TillError> {
        let data = self
            .data
            .read()
            .map_err(|e| TillError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let name_lower = name.trim().to_lowercase();
        Ok(data
            .values()
            .find(|l| l.name.to_lowercase() == name_lower)
            .cloned())
    }

    /// All locations sorted by name
    pub fn get_all(&self) -> Result<Vec<Location>, TillError> {
        let data = self
            .data
            .read()
            .map_err(|e| TillError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut locations: Vec<_> = data.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    pub fn upsert(&self, location: Location) -> Result<(), TillError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| TillError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(location.id, location);
        Ok(())
    }
}
