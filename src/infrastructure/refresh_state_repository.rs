use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshState {
    pub last_refresh_time: DateTime<Utc>,
}

/// Records when a property's availability was last fetched, so a relaunched
/// console knows how stale its cached calendar is.
pub trait RefreshStateRepository: Send + Sync {
    fn load(&self, property_id: &str) -> Result<Option<RefreshState>, InfraError>;
    fn save(
        &self,
        property_id: &str,
        last_refresh_time: DateTime<Utc>,
    ) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteRefreshStateRepository {
    db_path: PathBuf,
}

impl SqliteRefreshStateRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl RefreshStateRepository for SqliteRefreshStateRepository {
    fn load(&self, property_id: &str) -> Result<Option<RefreshState>, InfraError> {
        let connection = self.connect()?;
        let row: Option<String> = connection
            .query_row(
                "SELECT last_refresh_time FROM refresh_state WHERE property_id = ?1",
                params![property_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(last_refresh_time_raw) = row else {
            return Ok(None);
        };

        let parsed = DateTime::parse_from_rfc3339(&last_refresh_time_raw).map_err(|error| {
            InfraError::InvalidConfig(format!(
                "invalid refresh_state.last_refresh_time '{}': {error}",
                last_refresh_time_raw
            ))
        })?;

        Ok(Some(RefreshState {
            last_refresh_time: parsed.with_timezone(&Utc),
        }))
    }

    fn save(
        &self,
        property_id: &str,
        last_refresh_time: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO refresh_state (property_id, last_refresh_time)
             VALUES (?1, ?2)
             ON CONFLICT(property_id) DO UPDATE SET
               last_refresh_time = excluded.last_refresh_time",
            params![property_id, last_refresh_time.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRefreshStateRepository {
    states: Mutex<HashMap<String, RefreshState>>,
}

impl RefreshStateRepository for InMemoryRefreshStateRepository {
    fn load(&self, property_id: &str) -> Result<Option<RefreshState>, InfraError> {
        let states = self.states.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("refresh state lock poisoned: {error}"))
        })?;
        Ok(states.get(property_id).cloned())
    }

    fn save(
        &self,
        property_id: &str,
        last_refresh_time: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let mut states = self.states.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("refresh state lock poisoned: {error}"))
        })?;
        states.insert(
            property_id.to_string(),
            RefreshState { last_refresh_time },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn in_memory_repository_tracks_state_per_property() {
        let repository = InMemoryRefreshStateRepository::default();
        assert_eq!(repository.load("prop-1").expect("load succeeds"), None);

        repository
            .save("prop-1", fixed_time("2024-06-10T08:00:00Z"))
            .expect("save succeeds");
        repository
            .save("prop-2", fixed_time("2024-06-11T08:00:00Z"))
            .expect("save succeeds");

        let loaded = repository
            .load("prop-1")
            .expect("load succeeds")
            .expect("state exists");
        assert_eq!(loaded.last_refresh_time, fixed_time("2024-06-10T08:00:00Z"));
    }

    #[test]
    fn save_overwrites_the_previous_refresh_time() {
        let repository = InMemoryRefreshStateRepository::default();
        repository
            .save("prop-1", fixed_time("2024-06-10T08:00:00Z"))
            .expect("save succeeds");
        repository
            .save("prop-1", fixed_time("2024-06-12T09:30:00Z"))
            .expect("save succeeds");

        let loaded = repository
            .load("prop-1")
            .expect("load succeeds")
            .expect("state exists");
        assert_eq!(loaded.last_refresh_time, fixed_time("2024-06-12T09:30:00Z"));
    }
}
