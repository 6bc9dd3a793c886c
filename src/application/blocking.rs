use crate::domain::availability::expand_range;
use crate::domain::models::{CalendarDay, CalendarError, Selection};
use crate::infrastructure::availability_cache::{
    AvailabilityCacheRepository, PropertyAvailability,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::marketplace_client::{CreateBlockRequest, PropertyApiClient};
use crate::infrastructure::refresh_state_repository::RefreshStateRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum BlockingError {
    #[error("select at least one day before blocking")]
    EmptySelection,
    #[error("no stored block covers {day}")]
    BlockNotFound { day: CalendarDay },
    #[error("{0}")]
    Submission(String),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

/// The interval actually sent to the server: first and last of the sorted
/// selected days. Internal gaps collapse silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoveringInterval {
    pub start: CalendarDay,
    pub end: CalendarDay,
}

/// Date-blocking workflow for one property: refresh availability, submit a
/// finalized selection, remove a block by pointing at any day it covers.
/// Submission is fire-and-forget: no retry, no backoff, no idempotency key;
/// overlapping duplicates are the backend's to resolve.
pub struct BlockingService<C, R, S>
where
    C: PropertyApiClient,
    R: AvailabilityCacheRepository,
    S: RefreshStateRepository,
{
    api_client: Arc<C>,
    cache_repository: Arc<R>,
    refresh_state_repository: Arc<S>,
    now_provider: NowProvider,
}

impl<C, R, S> BlockingService<C, R, S>
where
    C: PropertyApiClient,
    R: AvailabilityCacheRepository,
    S: RefreshStateRepository,
{
    pub fn new(
        api_client: Arc<C>,
        cache_repository: Arc<R>,
        refresh_state_repository: Arc<S>,
    ) -> Self {
        Self {
            api_client,
            cache_repository,
            refresh_state_repository,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Fetches the property's booked/blocked state, replaces the cache
    /// entry and records the refresh time.
    pub async fn refresh(
        &self,
        access_token: &str,
        property_id: &str,
    ) -> Result<PropertyAvailability, BlockingError> {
        let payload = self
            .api_client
            .fetch_property_calendar(access_token, property_id)
            .await?;

        let mut availability = PropertyAvailability::default();
        for dto in &payload.booked_dates {
            availability.booked.push(dto.to_interval()?);
        }
        for dto in &payload.blocked_dates {
            availability.blocked.push(dto.to_interval()?);
        }

        self.cache_repository.replace(property_id, &availability)?;
        self.refresh_state_repository
            .save(property_id, (self.now_provider)())?;
        Ok(availability)
    }

    /// Submits the selection's minimal covering interval. On success the
    /// availability is refetched so the classifier sees the server's
    /// state; on failure the caller keeps the selection for retry.
    pub async fn submit(
        &self,
        access_token: &str,
        property_id: &str,
        selection: &Selection,
    ) -> Result<CoveringInterval, BlockingError> {
        let mut days = selection.selected_days()?;
        days.sort_unstable();
        let (Some(&start), Some(&end)) = (days.first(), days.last()) else {
            return Err(BlockingError::EmptySelection);
        };

        let request = CreateBlockRequest {
            start_date: start.to_wire_timestamp(),
            end_date: end.to_wire_timestamp(),
        };
        self.api_client
            .create_block(access_token, property_id, request)
            .await
            .map_err(Self::submission_error)?;

        self.refresh(access_token, property_id).await?;
        Ok(CoveringInterval { start, end })
    }

    /// Point-removal: expands every stored block and deletes the one whose
    /// days contain `day`. Linear in blocks times their length, which is
    /// fine at the handful of blocks a host keeps.
    pub async fn delete_block(
        &self,
        access_token: &str,
        property_id: &str,
        day: CalendarDay,
    ) -> Result<String, BlockingError> {
        let availability = match self.cache_repository.get(property_id)? {
            Some(cached) => cached,
            None => self.refresh(access_token, property_id).await?,
        };

        let mut containing_id = None;
        for interval in &availability.blocked {
            let days = expand_range(interval.start_date, interval.end_date)?;
            if days.contains(&day) {
                containing_id = Some(interval.id.clone());
                break;
            }
        }
        let Some(block_id) = containing_id else {
            return Err(BlockingError::BlockNotFound { day });
        };

        self.api_client
            .delete_block(access_token, property_id, &block_id)
            .await
            .map_err(Self::submission_error)?;
        self.cache_repository.remove_block(property_id, &block_id)?;
        Ok(block_id)
    }

    /// Backend failures surface the server's message verbatim.
    fn submission_error(error: InfraError) -> BlockingError {
        match error {
            InfraError::Api(message) => BlockingError::Submission(message),
            other => BlockingError::Submission(other.to_string()),
        }
    }
}
