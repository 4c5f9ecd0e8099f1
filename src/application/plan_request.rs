use crate::domain::models::{weekday_name, BusySlot, Goal, ScheduledBlock, Task, WEEKDAYS};
use crate::infrastructure::plan_mapper::{
    BusyEntry, DaySummary, GoalFocus, GoalSummary, Guidelines, PlanRequest, TaskSummary,
};
use chrono::Weekday;
use std::collections::BTreeMap;

const UNALIGNED_FOCUS: &str = "Unaligned";

/// Assembles the backend-agnostic generation payload. `push_day_summary`
/// carries context for days already placed within the same run; a
/// whole-week one-shot caller simply never pushes any.
#[derive(Debug, Clone)]
pub struct PlanRequestBuilder<'a> {
    tasks: &'a [Task],
    goals: &'a [Goal],
    busy_slots: &'a [BusySlot],
    prior_days: Vec<DaySummary>,
}

impl<'a> PlanRequestBuilder<'a> {
    pub fn new(tasks: &'a [Task], goals: &'a [Goal], busy_slots: &'a [BusySlot]) -> Self {
        Self {
            tasks,
            goals,
            busy_slots,
            prior_days: Vec::new(),
        }
    }

    pub fn push_day_summary(&mut self, weekday: Weekday, blocks: &[ScheduledBlock]) {
        let lines = blocks
            .iter()
            .map(|block| {
                let mut line = format!(
                    "{}-{}: task {}",
                    block.start.format("%H:%M"),
                    block.end.format("%H:%M"),
                    block.task_id
                );
                if let Some(note) = block.note.as_deref() {
                    line.push_str(&format!(" ({note})"));
                }
                line
            })
            .collect();

        self.prior_days.push(DaySummary {
            day: weekday_name(weekday).to_string(),
            lines,
        });
    }

    /// Zero tasks still produce a valid near-empty request; an empty plan
    /// is a legitimate outcome.
    pub fn build(&self) -> PlanRequest {
        PlanRequest {
            busy: self.busy_context(),
            tasks: self.tasks.iter().map(task_summary).collect(),
            goals: self
                .goals
                .iter()
                .map(|goal| GoalSummary {
                    id: goal.id.clone(),
                    title: goal.title.clone(),
                    description: goal.description.clone(),
                    difficulty: goal.difficulty,
                })
                .collect(),
            goal_focus: self.goal_focus(),
            guidelines: Guidelines::default(),
            prior_days: self.prior_days.clone(),
        }
    }

    fn busy_context(&self) -> BTreeMap<String, Vec<BusyEntry>> {
        WEEKDAYS
            .iter()
            .map(|weekday| {
                let mut slots: Vec<&BusySlot> = self
                    .busy_slots
                    .iter()
                    .filter(|slot| slot.weekday == *weekday)
                    .collect();
                slots.sort();

                let entries = slots
                    .into_iter()
                    .map(|slot| BusyEntry {
                        start: slot.start.format("%H:%M").to_string(),
                        end: slot.end.format("%H:%M").to_string(),
                        title: "Busy".to_string(),
                    })
                    .collect();
                (weekday_name(*weekday).to_string(), entries)
            })
            .collect()
    }

    fn goal_focus(&self) -> Vec<GoalFocus> {
        let known: std::collections::HashSet<&str> =
            self.goals.iter().map(|goal| goal.id.as_str()).collect();

        let mut focus: Vec<GoalFocus> = self
            .goals
            .iter()
            .map(|goal| GoalFocus {
                goal: goal.title.clone(),
                difficulty: goal.difficulty,
                tasks: self
                    .tasks
                    .iter()
                    .filter(|task| task.goal_id.as_deref() == Some(goal.id.as_str()))
                    .map(task_summary)
                    .collect(),
            })
            .collect();

        // Goal-less tasks and dangling goal references share one bucket.
        let unaligned: Vec<TaskSummary> = self
            .tasks
            .iter()
            .filter(|task| {
                task.goal_id
                    .as_deref()
                    .is_none_or(|goal_id| !known.contains(goal_id))
            })
            .map(task_summary)
            .collect();
        if !unaligned.is_empty() {
            focus.push(GoalFocus {
                goal: UNALIGNED_FOCUS.to_string(),
                difficulty: None,
                tasks: unaligned,
            });
        }

        focus
    }
}

fn task_summary(task: &Task) -> TaskSummary {
    TaskSummary {
        id: task.id.clone(),
        title: task.title.clone(),
        estimated_minutes: task.estimated_minutes,
        difficulty: task.difficulty,
        goal: task.goal_id.clone(),
        notes: task.notes.clone(),
    }
}
