use crate::application::plan_request::PlanRequestBuilder;
use crate::domain::conflicts::{find_conflicts, ConflictReport};
use crate::domain::models::{BusySlot, DurationDeviation, Goal, Task, WeeklySchedule};
use crate::infrastructure::credential_store::{resolve_api_key, CredentialStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::plan_client::PlanGeneratorClient;
use crate::infrastructure::plan_mapper::{
    map_plan_response, PlanRequest, RawPlanDays, RejectedCandidate,
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::time::{sleep, Duration as TokioDuration};

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("backend credential is not configured: {0}")]
    Configuration(String),
    #[error("plan generation failed: {0}")]
    Generation(String),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

/// Everything one generation run produced. Readers share the `Arc`; the
/// next successful run swaps in a fresh one and never touches this value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub schedule: WeeklySchedule,
    pub conflicts: ConflictReport,
    pub rejected: Vec<RejectedCandidate>,
    pub deviations: Vec<DurationDeviation>,
    pub generated_at: DateTime<Utc>,
}

pub struct ScheduleService<P, C>
where
    P: PlanGeneratorClient,
    C: CredentialStore,
{
    plan_client: Arc<P>,
    credential_store: Arc<C>,
    model: String,
    retry_policy: RetryPolicy,
    now_provider: NowProvider,
    active: Mutex<Option<Arc<ScheduleSnapshot>>>,
    generation_gate: tokio::sync::Mutex<()>,
}

impl<P, C> ScheduleService<P, C>
where
    P: PlanGeneratorClient,
    C: CredentialStore,
{
    pub fn new(plan_client: Arc<P>, credential_store: Arc<C>, model: impl Into<String>) -> Self {
        Self {
            plan_client,
            credential_store,
            model: model.into(),
            retry_policy: RetryPolicy::default(),
            now_provider: Arc::new(Utc::now),
            active: Mutex::new(None),
            generation_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Builds the request, calls the plan generator, validates the answer
    /// and publishes a fresh snapshot. Concurrent calls queue behind the
    /// generation gate; a failed run leaves the previous snapshot active.
    pub async fn generate(
        &self,
        tasks: &[Task],
        goals: &[Goal],
        busy_slots: &[BusySlot],
    ) -> Result<Arc<ScheduleSnapshot>, ScheduleError> {
        let _running = self.generation_gate.lock().await;

        let api_key = resolve_api_key(self.credential_store.as_ref())
            .map_err(|error| ScheduleError::Configuration(error.to_string()))?
            .ok_or_else(|| {
                ScheduleError::Configuration(
                    "no API key in the environment or credential store".to_string(),
                )
            })?;

        let request = PlanRequestBuilder::new(tasks, goals, busy_slots).build();
        info!(
            "requesting weekly plan: {} tasks, {} goals, {} busy slots",
            tasks.len(),
            goals.len(),
            busy_slots.len()
        );

        let raw = self
            .generate_with_retry(&api_key, &request)
            .await
            .map_err(|error| ScheduleError::Generation(error.to_string()))?;

        let outcome = map_plan_response(&raw, tasks);
        for rejected in &outcome.rejected {
            warn!(
                "dropped candidate block on '{}': {}",
                rejected.day, rejected.reason
            );
        }
        if outcome.accepted.is_empty() && !tasks.is_empty() {
            return Err(ScheduleError::Generation(
                "backend returned no usable candidate blocks".to_string(),
            ));
        }

        let schedule = WeeklySchedule::from_blocks(outcome.accepted);
        let conflicts = find_conflicts(&schedule, busy_slots);
        if !conflicts.is_empty() {
            warn!("generated schedule has {} conflicts", conflicts.total());
        }

        let snapshot = Arc::new(ScheduleSnapshot {
            schedule,
            conflicts,
            rejected: outcome.rejected,
            deviations: outcome.deviations,
            generated_at: (self.now_provider)(),
        });

        let mut active = self.active.lock().map_err(|error| {
            ScheduleError::Generation(format!("active schedule lock poisoned: {error}"))
        })?;
        *active = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn active_snapshot(&self) -> Option<Arc<ScheduleSnapshot>> {
        self.active.lock().ok().and_then(|guard| guard.clone())
    }

    async fn generate_with_retry(
        &self,
        api_key: &str,
        request: &PlanRequest,
    ) -> Result<RawPlanDays, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self
                .plan_client
                .generate_plan(api_key, &self.model, request)
                .await
            {
                Ok(response) => return Ok(response),
                Err(error) if Self::should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn should_retry(error: &InfraError) -> bool {
        match error {
            InfraError::Backend(message) => {
                let message = message.to_ascii_lowercase();
                message.contains("network error")
                    || message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("connection reset")
            }
            _ => false,
        }
    }
}
