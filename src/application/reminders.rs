use crate::domain::models::{ReminderEvent, ScheduledBlock, WeeklySchedule};
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("no schedule blocks to arm reminders for")]
    NoSchedule,
}

/// Presenter seam: receives the reminder text and its scheduled fire time.
/// Delivery happens at or after `fires_at`, never before.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, message: &str, fires_at: DateTime<Utc>);
}

/// Places every block at its weekday/start within the current calendar
/// week of `now` (read in `tz`). An instant at or before `now` rolls
/// forward by exactly seven days, once; recomputation is idempotent for
/// equal inputs.
pub fn compute_reminder_events(
    schedule: &WeeklySchedule,
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<ReminderEvent> {
    let local_now = now.with_timezone(&tz);
    let week_start = local_now.date_naive()
        - Duration::days(i64::from(local_now.weekday().num_days_from_monday()));

    let mut events: Vec<ReminderEvent> = schedule
        .blocks()
        .iter()
        .map(|block| {
            let date = week_start
                + Duration::days(i64::from(block.weekday.num_days_from_monday()));
            let naive = date.and_time(block.start);

            let this_week = resolve_local(tz, naive);
            let fires_at = if this_week <= now {
                resolve_local(tz, naive + Duration::days(7))
            } else {
                this_week
            };

            ReminderEvent {
                fires_at,
                message: reminder_message(block),
                block: block.clone(),
            }
        })
        .collect();

    events.sort_by(|a, b| {
        a.fires_at
            .cmp(&b.fires_at)
            .then_with(|| a.block.task_id.cmp(&b.block.task_id))
    });
    events
}

fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(resolved) = tz.from_local_datetime(&naive).earliest() {
        return resolved.with_timezone(&Utc);
    }

    // Nonexistent local time (spring-forward gap): shift one hour later.
    warn!("local time {naive} does not exist in {tz}, shifting one hour");
    tz.from_local_datetime(&(naive + Duration::hours(1)))
        .earliest()
        .map(|resolved| resolved.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

fn reminder_message(block: &ScheduledBlock) -> String {
    let mut message = format!("task {} {}", block.task_id, block.interval());
    if let Some(note) = block.note.as_deref() {
        message.push_str(&format!(" ({note})"));
    }
    message
}

struct ArmedPeriod {
    token: CancellationToken,
    tasks: JoinSet<()>,
}

/// Stopped until armed; armed until stopped or re-armed. Each arming
/// period owns a fresh cancellation token, and cancelling it silences
/// every not-yet-fired event before any new period starts.
#[derive(Default)]
pub struct ReminderCoordinator {
    armed: tokio::sync::Mutex<Option<ArmedPeriod>>,
}

impl ReminderCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn arm(
        &self,
        events: Vec<ReminderEvent>,
        now: DateTime<Utc>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<usize, ReminderError> {
        if events.is_empty() {
            return Err(ReminderError::NoSchedule);
        }

        let mut guard = self.armed.lock().await;
        cancel_period(guard.take());

        let token = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let count = events.len();

        for event in events {
            let child = token.child_token();
            let sink = Arc::clone(&sink);
            let delay = (event.fires_at - now).to_std().unwrap_or_default();

            tasks.spawn(async move {
                tokio::select! {
                    _ = child.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {
                        info!("firing reminder: {}", event.message);
                        sink.deliver(&event.message, event.fires_at);
                    }
                }
            });
        }

        *guard = Some(ArmedPeriod { token, tasks });
        info!("armed {count} reminders");
        Ok(count)
    }

    pub async fn stop(&self) {
        let previous = self.armed.lock().await.take();
        if previous.is_some() {
            info!("reminders stopped");
        }
        cancel_period(previous);
    }

    pub async fn is_armed(&self) -> bool {
        self.armed.lock().await.is_some()
    }
}

fn cancel_period(period: Option<ArmedPeriod>) {
    if let Some(period) = period {
        period.token.cancel();
        // Dropping the JoinSet aborts anything still pending.
        drop(period.tasks);
    }
}
