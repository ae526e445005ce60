//! Location service
//!
//! Configures locations and their fixed floats. The shift engine only reads
//! them.

use crate::error::{TillError, TillResult};
use crate::models::{Location, LocationId, Money};
use crate::storage::Storage;

pub struct LocationService<'a> {
    storage: &'a Storage,
}

impl<'a> LocationService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a location with a fixed float
    pub fn create(&self, name: &str, fixed_float: Money) -> TillResult<Location> {
        let name = name.trim();
        let location = Location::new(name, fixed_float);
        location
            .validate()
            .map_err(|e| TillError::validation(e.field(), e.to_string()))?;

        // Another process may have added locations since this one loaded
        let _commit_lock = self.storage.commit_lock()?;
        self.storage.locations.load()?;

        if self.storage.locations.get_by_name(name)?.is_some() {
            return Err(TillError::conflict(
                "unique-location-name",
                format!("Location '{}' already exists", name),
            ));
        }

        self.storage.locations.upsert(location.clone())?;
        self.storage.save_locations()?;
        Ok(location)
    }

    pub fn get(&self, id: LocationId) -> TillResult<Location> {
        self.storage
            .locations
            .get(id)?
            .ok_or_else(|| TillError::location_not_found(id.to_string()))
    }

    /// Find a location by name, full id or abbreviated id
    pub fn find(&self, identifier: &str) -> TillResult<Location> {
        let identifier = identifier.trim();

        if let Some(location) = self.storage.locations.get_by_name(identifier)? {
            return Ok(location);
        }
        if let Ok(id) = identifier.parse::<LocationId>() {
            if let Some(location) = self.storage.locations.get(id)? {
                return Ok(location);
            }
        }

        self.storage
            .locations
            .get_all()?
            .into_iter()
            .find(|l| l.id.to_string() == identifier)
            .ok_or_else(|| TillError::location_not_found(identifier))
    }

    pub fn list(&self) -> TillResult<Vec<Location>> {
        self.storage.locations.get_all()
    }
}
