use crate::application::blocking::{BlockingError, BlockingService};
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::selection::{SelectionController, SelectionError};
use crate::domain::availability::{classify, expand_range};
use crate::domain::models::{
    CalendarDay, CalendarError, DayClassification, SessionRole, SessionToken,
};
use crate::infrastructure::availability_cache::{
    AvailabilityCacheRepository, InMemoryAvailabilityCacheRepository, PropertyAvailability,
};
use crate::infrastructure::config::read_api_base_url;
use crate::infrastructure::credential_store::{CredentialStore, KeyringCredentialStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::marketplace_client::ReqwestPropertyApiClient;
use crate::infrastructure::refresh_state_repository::{
    RefreshStateRepository, SqliteRefreshStateRepository,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Blocking(#[from] BlockingError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("{0}")]
    InvalidInput(String),
}

/// Per-screen console state: workspace paths, the shared availability
/// cache, and the active property's selection. One screen instance owns
/// this; nothing is shared across tabs.
pub struct ConsoleState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    availability_cache: Arc<InMemoryAvailabilityCacheRepository>,
    credential_store: Arc<dyn CredentialStore>,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
    now_provider: NowProvider,
}

impl ConsoleState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");

        Ok(Self {
            config_dir,
            database_path: bootstrap.database_path,
            logs_dir,
            availability_cache: Arc::new(InMemoryAvailabilityCacheRepository::default()),
            credential_store: Arc::new(KeyringCredentialStore::default()),
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
            now_provider: Arc::new(Utc::now),
        })
    }

    pub fn with_credential_store(mut self, credential_store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = credential_store;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn today(&self) -> CalendarDay {
        CalendarDay::new((self.now_provider)().date_naive())
    }

    pub fn command_error(&self, command: &str, error: &CommandError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": (self.now_provider)().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Default)]
struct RuntimeState {
    active_property_id: Option<String>,
    selection: SelectionController,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatusResponse {
    pub status: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OpenPropertyResponse {
    pub property_id: String,
    pub booked_intervals: usize,
    pub blocked_intervals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayCellResponse {
    pub date: String,
    pub classification: DayClassification,
    pub css_class: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LegendEntryResponse {
    pub classification: DayClassification,
    pub css_class: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarViewResponse {
    pub property_id: String,
    pub days: Vec<DayCellResponse>,
    pub legend: Vec<LegendEntryResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SelectionResponse {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub selected_days: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlockDatesResponse {
    pub start_date: String,
    pub end_date: String,
    pub days_blocked: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnblockDateResponse {
    pub removed_block_id: String,
}

pub fn store_session_token_impl(
    state: &ConsoleState,
    access_token: String,
    role: String,
) -> Result<SessionStatusResponse, CommandError> {
    let access_token = access_token.trim();
    if access_token.is_empty() {
        return Err(CommandError::InvalidInput(
            "access_token must not be empty".to_string(),
        ));
    }
    let role = parse_session_role(&role)?;

    let token = SessionToken {
        access_token: access_token.to_string(),
        role: role.clone(),
        issued_at: (state.now_provider)(),
    };
    state.credential_store.save_token(&token)?;
    state.log_info("store_session_token", "stored marketplace session token");

    Ok(SessionStatusResponse {
        status: "stored".to_string(),
        role: session_role_to_string(&role).to_string(),
    })
}

pub fn clear_session_impl(state: &ConsoleState) -> Result<bool, CommandError> {
    state.credential_store.delete_token()?;
    state.log_info("clear_session", "deleted marketplace session token");
    Ok(true)
}

/// Makes the property the active one: refetch its availability, reset the
/// selection and rebuild the exclusion sets.
pub async fn open_property_calendar_impl(
    state: &ConsoleState,
    property_id: String,
) -> Result<OpenPropertyResponse, CommandError> {
    let property_id = normalized_property_id(&property_id)?;
    let access_token = required_access_token(state)?;

    let service = blocking_service(state)?;
    let availability = service.refresh(&access_token, &property_id).await?;
    apply_availability(state, &property_id, &availability)?;

    let refresh_repo = SqliteRefreshStateRepository::new(state.database_path());
    let last_refresh_time = refresh_repo
        .load(&property_id)?
        .map(|refresh_state| refresh_state.last_refresh_time.to_rfc3339());

    state.log_info(
        "open_property_calendar",
        &format!(
            "loaded property_id={property_id} booked={} blocked={}",
            availability.booked.len(),
            availability.blocked.len()
        ),
    );

    Ok(OpenPropertyResponse {
        property_id,
        booked_intervals: availability.booked.len(),
        blocked_intervals: availability.blocked.len(),
        last_refresh_time,
    })
}

/// One cell per day of the requested window, classified against "today",
/// plus the five-entry legend the screen renders next to the picker.
pub fn calendar_view_impl(
    state: &ConsoleState,
    property_id: String,
    from: String,
    until: String,
) -> Result<CalendarViewResponse, CommandError> {
    let property_id = normalized_property_id(&property_id)?;
    let from = parse_day_input(&from, "from")?;
    let until = parse_day_input(&until, "until")?;
    let today = state.today();

    let runtime = lock_runtime(state)?;
    ensure_active_property(&runtime, &property_id)?;

    let selection = runtime.selection.selection();
    let days = expand_range(from, until)?
        .into_iter()
        .map(|day| {
            let classification = classify(
                day,
                today,
                &selection,
                runtime.selection.booked_days(),
                runtime.selection.blocked_days(),
            );
            DayCellResponse {
                date: day.to_string(),
                classification,
                css_class: classification.css_class().to_string(),
            }
        })
        .collect();

    Ok(CalendarViewResponse {
        property_id,
        days,
        legend: legend_entries(),
    })
}

pub fn pick_check_in_impl(
    state: &ConsoleState,
    property_id: String,
    date: String,
) -> Result<SelectionResponse, CommandError> {
    let property_id = normalized_property_id(&property_id)?;
    let day = parse_day_input(&date, "date")?;
    ensure_not_past(state, day)?;

    let mut runtime = lock_runtime(state)?;
    ensure_active_property(&runtime, &property_id)?;
    runtime.selection.pick_check_in(day)?;
    Ok(selection_response(&runtime))
}

pub fn pick_check_out_impl(
    state: &ConsoleState,
    property_id: String,
    date: String,
) -> Result<SelectionResponse, CommandError> {
    let property_id = normalized_property_id(&property_id)?;
    let day = parse_day_input(&date, "date")?;
    ensure_not_past(state, day)?;

    let mut runtime = lock_runtime(state)?;
    ensure_active_property(&runtime, &property_id)?;
    runtime.selection.pick_check_out(day)?;
    Ok(selection_response(&runtime))
}

pub fn clear_selection_impl(
    state: &ConsoleState,
    property_id: String,
) -> Result<SelectionResponse, CommandError> {
    let property_id = normalized_property_id(&property_id)?;
    let mut runtime = lock_runtime(state)?;
    ensure_active_property(&runtime, &property_id)?;
    runtime.selection.clear();
    Ok(selection_response(&runtime))
}

/// Submits the current selection as a block. On success the selection is
/// cleared and the exclusion sets rebuilt from the refetched availability;
/// on failure the selection is preserved so the host can retry.
pub async fn block_dates_impl(
    state: &ConsoleState,
    property_id: String,
) -> Result<BlockDatesResponse, CommandError> {
    let property_id = normalized_property_id(&property_id)?;
    let selection = {
        let runtime = lock_runtime(state)?;
        ensure_active_property(&runtime, &property_id)?;
        runtime.selection.selection()
    };
    let access_token = required_access_token(state)?;

    let service = blocking_service(state)?;
    let interval = service
        .submit(&access_token, &property_id, &selection)
        .await?;

    let refreshed = state
        .availability_cache
        .get(&property_id)?
        .unwrap_or_default();
    apply_availability(state, &property_id, &refreshed)?;

    let days_blocked = expand_range(interval.start, interval.end)?.len();
    state.log_info(
        "block_dates",
        &format!(
            "blocked property_id={property_id} start={} end={} days={days_blocked}",
            interval.start, interval.end
        ),
    );

    Ok(BlockDatesResponse {
        start_date: interval.start.to_string(),
        end_date: interval.end.to_string(),
        days_blocked,
    })
}

/// Removes the stored block covering `date`.
pub async fn unblock_date_impl(
    state: &ConsoleState,
    property_id: String,
    date: String,
) -> Result<UnblockDateResponse, CommandError> {
    let property_id = normalized_property_id(&property_id)?;
    let day = parse_day_input(&date, "date")?;
    let access_token = required_access_token(state)?;

    let service = blocking_service(state)?;
    let removed_block_id = service
        .delete_block(&access_token, &property_id, day)
        .await?;

    let refreshed = state
        .availability_cache
        .get(&property_id)?
        .unwrap_or_default();
    {
        let mut runtime = lock_runtime(state)?;
        if runtime.active_property_id.as_deref() == Some(property_id.as_str()) {
            runtime
                .selection
                .set_exclusions(&refreshed.booked, &refreshed.blocked)?;
        }
    }

    state.log_info(
        "unblock_date",
        &format!("removed block_id={removed_block_id} covering {day} on property_id={property_id}"),
    );

    Ok(UnblockDateResponse { removed_block_id })
}

/// Installs a freshly fetched availability as the active screen state:
/// active property switched, selection reset, exclusion sets rebuilt.
fn apply_availability(
    state: &ConsoleState,
    property_id: &str,
    availability: &PropertyAvailability,
) -> Result<(), CommandError> {
    let mut runtime = lock_runtime(state)?;
    runtime.active_property_id = Some(property_id.to_string());
    runtime.selection.clear();
    runtime
        .selection
        .set_exclusions(&availability.booked, &availability.blocked)?;
    Ok(())
}

fn blocking_service(
    state: &ConsoleState,
) -> Result<
    BlockingService<
        ReqwestPropertyApiClient,
        InMemoryAvailabilityCacheRepository,
        SqliteRefreshStateRepository,
    >,
    CommandError,
> {
    let base_url = read_api_base_url(state.config_dir())?;
    let api_client = Arc::new(ReqwestPropertyApiClient::new(base_url));
    let refresh_repo = Arc::new(SqliteRefreshStateRepository::new(state.database_path()));
    Ok(BlockingService::new(
        api_client,
        Arc::clone(&state.availability_cache),
        refresh_repo,
    )
    .with_now_provider(Arc::clone(&state.now_provider)))
}

fn required_access_token(state: &ConsoleState) -> Result<String, CommandError> {
    let token = state
        .credential_store
        .load_token()?
        .filter(SessionToken::is_usable)
        .ok_or_else(|| {
            InfraError::Credential("no session token stored; sign in first".to_string())
        })?;
    Ok(token.access_token)
}

fn lock_runtime(state: &ConsoleState) -> Result<MutexGuard<'_, RuntimeState>, CommandError> {
    state.runtime.lock().map_err(|error| {
        CommandError::Infra(InfraError::InvalidConfig(format!(
            "runtime state lock poisoned: {error}"
        )))
    })
}

fn ensure_active_property(
    runtime: &RuntimeState,
    property_id: &str,
) -> Result<(), CommandError> {
    if runtime.active_property_id.as_deref() != Some(property_id) {
        return Err(CommandError::InvalidInput(format!(
            "property {property_id} is not loaded; open its calendar first"
        )));
    }
    Ok(())
}

fn ensure_not_past(state: &ConsoleState, day: CalendarDay) -> Result<(), CommandError> {
    let today = state.today();
    if day < today {
        return Err(CommandError::InvalidInput(format!(
            "{day} is in the past; the earliest selectable day is {today}"
        )));
    }
    Ok(())
}

fn normalized_property_id(property_id: &str) -> Result<String, CommandError> {
    let normalized = property_id.trim();
    if normalized.is_empty() {
        return Err(CommandError::InvalidInput(
            "property_id must not be empty".to_string(),
        ));
    }
    Ok(normalized.to_string())
}

fn parse_day_input(value: &str, field_name: &str) -> Result<CalendarDay, CommandError> {
    CalendarDay::parse(value)
        .map_err(|error| CommandError::InvalidInput(format!("invalid {field_name}: {error}")))
}

fn parse_session_role(value: &str) -> Result<SessionRole, CommandError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "admin" => Ok(SessionRole::Admin),
        "host" => Ok(SessionRole::Host),
        other => Err(CommandError::InvalidInput(format!(
            "unsupported session role: {}",
            other
        ))),
    }
}

fn session_role_to_string(role: &SessionRole) -> &'static str {
    match role {
        SessionRole::Admin => "admin",
        SessionRole::Host => "host",
    }
}

fn selection_response(runtime: &RuntimeState) -> SelectionResponse {
    let selection = runtime.selection.selection();
    SelectionResponse {
        check_in: selection.check_in.map(|day| day.to_string()),
        check_out: selection.check_out.map(|day| day.to_string()),
        selected_days: runtime
            .selection
            .selected_days()
            .into_iter()
            .map(|day| day.to_string())
            .collect(),
    }
}

fn legend_entries() -> Vec<LegendEntryResponse> {
    DayClassification::ALL
        .into_iter()
        .map(|classification| LegendEntryResponse {
            classification,
            css_class: classification.css_class().to_string(),
            label: classification.legend_label().to_string(),
        })
        .collect()
}
