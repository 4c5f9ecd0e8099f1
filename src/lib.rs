mod application;
mod domain;
mod infrastructure;

pub use application::plan_request::PlanRequestBuilder;
pub use application::planner::WeeklyPlanner;
pub use application::reminders::{
    compute_reminder_events, NotificationSink, ReminderCoordinator, ReminderError,
};
pub use application::schedule_service::{
    RetryPolicy, ScheduleError, ScheduleService, ScheduleSnapshot,
};
pub use domain::conflicts::{find_conflicts, BlockConflict, BusyConflict, ConflictReport};
pub use domain::models::{
    parse_hhmm, parse_weekday, weekday_name, BusySlot, Difficulty, DurationDeviation, Goal,
    ReminderEvent, ScheduledBlock, Task, TimeInterval, WeeklySchedule, WEEKDAYS,
};
pub use infrastructure::config::{PlannerSettings, DEFAULT_MODEL, MODEL_ENV, TIMEZONE_ENV};
pub use infrastructure::credential_store::{
    resolve_api_key, ApiCredential, CredentialStore, EnvBackedCredentialStore,
    InMemoryCredentialStore, KeyringCredentialStore, API_KEY_ENV,
};
pub use infrastructure::error::InfraError;
pub use infrastructure::plan_client::{PlanGeneratorClient, ReqwestOpenAiClient};
pub use infrastructure::plan_mapper::{
    map_plan_response, BusyEntry, DaySummary, GoalFocus, GoalSummary, Guidelines, PlanOutcome,
    PlanRequest, RawPlanBlock, RawPlanDays, RejectedCandidate, TaskSummary,
};
