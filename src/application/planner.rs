use crate::application::reminders::{
    compute_reminder_events, NotificationSink, ReminderCoordinator, ReminderError,
};
use crate::application::schedule_service::{
    RetryPolicy, ScheduleError, ScheduleService, ScheduleSnapshot,
};
use crate::domain::models::{BusySlot, Goal, Task};
use crate::infrastructure::config::PlannerSettings;
use crate::infrastructure::credential_store::{
    CredentialStore, EnvBackedCredentialStore, KeyringCredentialStore,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::plan_client::{PlanGeneratorClient, ReqwestOpenAiClient};
use chrono::{DateTime, Utc};
use std::sync::Arc;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The single actor surface over the core: one active schedule snapshot,
/// one reminder arming period, one generation in flight at a time.
pub struct WeeklyPlanner<P, C>
where
    P: PlanGeneratorClient,
    C: CredentialStore,
{
    service: ScheduleService<P, C>,
    reminders: ReminderCoordinator,
    settings: PlannerSettings,
    now_provider: NowProvider,
}

impl WeeklyPlanner<ReqwestOpenAiClient, EnvBackedCredentialStore<KeyringCredentialStore>> {
    /// Default wiring: OpenAI over HTTPS, API key from `OPENAI_API_KEY`
    /// or the platform keyring, model/timezone from the environment.
    pub fn from_env() -> Result<Self, InfraError> {
        let settings = PlannerSettings::from_env()?;
        Ok(Self::new(
            Arc::new(ReqwestOpenAiClient::new()),
            Arc::new(EnvBackedCredentialStore::new(
                KeyringCredentialStore::default(),
            )),
            settings,
        ))
    }
}

impl<P, C> WeeklyPlanner<P, C>
where
    P: PlanGeneratorClient,
    C: CredentialStore,
{
    pub fn new(plan_client: Arc<P>, credential_store: Arc<C>, settings: PlannerSettings) -> Self {
        Self {
            service: ScheduleService::new(plan_client, credential_store, settings.model.clone()),
            reminders: ReminderCoordinator::new(),
            settings,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.service = self.service.with_retry_policy(retry_policy);
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.service = self.service.with_now_provider(Arc::clone(&now_provider));
        self.now_provider = now_provider;
        self
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Generates a fresh schedule. On success the previous arming period
    /// is cancelled: a superseded schedule's reminders must never fire.
    pub async fn generate_schedule(
        &self,
        tasks: &[Task],
        goals: &[Goal],
        busy_slots: &[BusySlot],
    ) -> Result<Arc<ScheduleSnapshot>, ScheduleError> {
        let snapshot = self.service.generate(tasks, goals, busy_slots).await?;
        self.reminders.stop().await;
        Ok(snapshot)
    }

    pub fn active_snapshot(&self) -> Option<Arc<ScheduleSnapshot>> {
        self.service.active_snapshot()
    }

    /// Recomputes the full reminder set from the active schedule against
    /// the current wall clock and arms it, replacing any earlier period.
    pub async fn start_reminders(
        &self,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<usize, ReminderError> {
        let Some(snapshot) = self.service.active_snapshot() else {
            return Err(ReminderError::NoSchedule);
        };

        let now = (self.now_provider)();
        let events = compute_reminder_events(&snapshot.schedule, now, self.settings.timezone);
        self.reminders.arm(events, now, sink).await
    }

    pub async fn stop_reminders(&self) {
        self.reminders.stop().await;
    }

    pub async fn reminders_armed(&self) -> bool {
        self.reminders.is_armed().await
    }
}
