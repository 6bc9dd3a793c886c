use crate::domain::models::{BlockedInterval, BookedInterval};
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Last-fetched booked/blocked state for one property. The screen's
/// classifier reads from this; the server stays the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyAvailability {
    pub booked: Vec<BookedInterval>,
    pub blocked: Vec<BlockedInterval>,
}

pub trait AvailabilityCacheRepository: Send + Sync {
    fn get(&self, property_id: &str) -> Result<Option<PropertyAvailability>, InfraError>;
    fn replace(
        &self,
        property_id: &str,
        availability: &PropertyAvailability,
    ) -> Result<(), InfraError>;
    fn remove_block(&self, property_id: &str, block_id: &str) -> Result<(), InfraError>;
    fn clear(&self, property_id: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemoryAvailabilityCacheRepository {
    entries: Mutex<HashMap<String, PropertyAvailability>>,
}

impl InMemoryAvailabilityCacheRepository {
    fn normalized_id(property_id: &str) -> Option<String> {
        let normalized = property_id.trim();
        if normalized.is_empty() {
            return None;
        }
        Some(normalized.to_string())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, PropertyAvailability>>, InfraError> {
        self.entries.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("availability cache lock poisoned: {error}"))
        })
    }
}

impl AvailabilityCacheRepository for InMemoryAvailabilityCacheRepository {
    fn get(&self, property_id: &str) -> Result<Option<PropertyAvailability>, InfraError> {
        let Some(property_id) = Self::normalized_id(property_id) else {
            return Ok(None);
        };
        let entries = self.lock()?;
        Ok(entries.get(&property_id).cloned())
    }

    fn replace(
        &self,
        property_id: &str,
        availability: &PropertyAvailability,
    ) -> Result<(), InfraError> {
        let property_id = Self::normalized_id(property_id).ok_or_else(|| {
            InfraError::InvalidConfig("property id is required for cache replace".to_string())
        })?;
        let mut entries = self.lock()?;
        entries.insert(property_id, availability.clone());
        Ok(())
    }

    fn remove_block(&self, property_id: &str, block_id: &str) -> Result<(), InfraError> {
        let Some(property_id) = Self::normalized_id(property_id) else {
            return Ok(());
        };
        let mut entries = self.lock()?;
        if let Some(availability) = entries.get_mut(&property_id) {
            availability
                .blocked
                .retain(|interval| interval.id != block_id.trim());
        }
        Ok(())
    }

    fn clear(&self, property_id: &str) -> Result<(), InfraError> {
        let Some(property_id) = Self::normalized_id(property_id) else {
            return Ok(());
        };
        let mut entries = self.lock()?;
        entries.remove(&property_id);
        Ok(())
    }
}
