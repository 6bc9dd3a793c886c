pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::blocking::{BlockingError, BlockingService, CoveringInterval};
pub use application::bootstrap::bootstrap_workspace;
pub use application::commands::{
    BlockDatesResponse, CalendarViewResponse, CommandError, ConsoleState, DayCellResponse,
    LegendEntryResponse, OpenPropertyResponse, SelectionResponse, SessionStatusResponse,
    UnblockDateResponse, block_dates_impl, calendar_view_impl, clear_selection_impl,
    clear_session_impl, open_property_calendar_impl, pick_check_in_impl, pick_check_out_impl,
    store_session_token_impl, unblock_date_impl,
};
pub use application::selection::{SelectionController, SelectionError, SelectionObserver};
pub use domain::availability::{blocked_day_set, booked_day_set, classify, expand_range};
pub use domain::models::{
    BlockedInterval, BookedInterval, CalendarDay, CalendarError, DayClassification, Selection,
    SelectionState, SessionRole, SessionToken,
};
pub use infrastructure::availability_cache::{
    AvailabilityCacheRepository, InMemoryAvailabilityCacheRepository, PropertyAvailability,
};
pub use infrastructure::credential_store::{
    CredentialStore, InMemoryCredentialStore, KeyringCredentialStore,
};
pub use infrastructure::error::InfraError;
pub use infrastructure::marketplace_client::{
    BlockedDateDto, BookedRangeDto, CreateBlockRequest, PropertyApiClient,
    PropertyCalendarResponse, ReqwestPropertyApiClient,
};
pub use infrastructure::refresh_state_repository::{
    InMemoryRefreshStateRepository, RefreshState, RefreshStateRepository,
    SqliteRefreshStateRepository,
};
