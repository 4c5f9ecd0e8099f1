use crate::domain::models::{
    parse_hhmm, parse_weekday, Difficulty, DurationDeviation, ScheduledBlock, Task, WEEKDAYS,
};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Backend-agnostic request payload. Adapters own the wire framing; this
/// struct is what they serialize into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanRequest {
    pub busy: BTreeMap<String, Vec<BusyEntry>>,
    pub tasks: Vec<TaskSummary>,
    pub goals: Vec<GoalSummary>,
    pub goal_focus: Vec<GoalFocus>,
    pub guidelines: Guidelines,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior_days: Vec<DaySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusyEntry {
    pub start: String,
    pub end: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub estimated_minutes: u32,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalFocus {
    pub goal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySummary {
    pub day: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guidelines {
    pub respect_busy: String,
    pub balance: String,
    pub one_task_per_block: String,
}

impl Default for Guidelines {
    fn default() -> Self {
        Self {
            respect_busy: "Never place a block over a busy interval.".to_string(),
            balance: "Balance workload across the week and mix easy and difficult sessions."
                .to_string(),
            one_task_per_block: "Each block advances exactly one task, referenced by its id."
                .to_string(),
        }
    }
}

/// Structured payload the plan generator returns: candidate blocks grouped
/// under full weekday names, as in `{"days": {"Monday": [...]}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPlanDays {
    #[serde(default)]
    pub days: BTreeMap<String, Vec<RawPlanBlock>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPlanBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectedCandidate {
    pub day: String,
    pub raw: RawPlanBlock,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    pub accepted: Vec<ScheduledBlock>,
    pub rejected: Vec<RejectedCandidate>,
    pub deviations: Vec<DurationDeviation>,
}

/// Per-candidate validation: a bad entry is recorded and dropped, never
/// fatal to the rest of the response. Days are walked Monday through
/// Sunday, then unknown day keys in sorted order.
pub fn map_plan_response(raw: &RawPlanDays, tasks: &[Task]) -> PlanOutcome {
    let task_index: HashMap<&str, &Task> = tasks
        .iter()
        .map(|task| (task.id.as_str(), task))
        .collect();
    let mut outcome = PlanOutcome::default();

    for weekday in WEEKDAYS {
        for (day_key, entries) in raw
            .days
            .iter()
            .filter(|(day_key, _)| parse_weekday(day_key) == Some(weekday))
        {
            for entry in entries {
                map_candidate(weekday, day_key, entry, &task_index, &mut outcome);
            }
        }
    }

    for (day_key, entries) in raw
        .days
        .iter()
        .filter(|(day_key, _)| parse_weekday(day_key).is_none())
    {
        for entry in entries {
            outcome.rejected.push(RejectedCandidate {
                day: day_key.clone(),
                raw: entry.clone(),
                reason: format!("unknown weekday '{day_key}'"),
            });
        }
    }

    outcome
}

fn map_candidate(
    weekday: Weekday,
    day_key: &str,
    entry: &RawPlanBlock,
    task_index: &HashMap<&str, &Task>,
    outcome: &mut PlanOutcome,
) {
    let reject = |reason: String, outcome: &mut PlanOutcome| {
        outcome.rejected.push(RejectedCandidate {
            day: day_key.to_string(),
            raw: entry.clone(),
            reason,
        });
    };

    let Some(task_id) = entry
        .task
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        reject("missing task reference".to_string(), outcome);
        return;
    };
    let Some(task) = task_index.get(task_id) else {
        reject(format!("unknown task reference '{task_id}'"), outcome);
        return;
    };

    let Some(start_raw) = entry.start.as_deref() else {
        reject("missing start time".to_string(), outcome);
        return;
    };
    let Some(start) = parse_hhmm(start_raw) else {
        reject(format!("start '{start_raw}' must be HH:MM"), outcome);
        return;
    };

    let Some(end_raw) = entry.end.as_deref() else {
        reject("missing end time".to_string(), outcome);
        return;
    };
    let Some(end) = parse_hhmm(end_raw) else {
        reject(format!("end '{end_raw}' must be HH:MM"), outcome);
        return;
    };

    if start >= end {
        reject(
            format!("block must start before it ends within one day ({start_raw}-{end_raw})"),
            outcome,
        );
        return;
    }

    let block = ScheduledBlock {
        task_id: task_id.to_string(),
        weekday,
        start,
        end,
        note: entry
            .note
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
    };

    let actual_minutes = block.duration_minutes();
    if actual_minutes != i64::from(task.estimated_minutes) {
        outcome.deviations.push(DurationDeviation {
            task_id: block.task_id.clone(),
            weekday,
            expected_minutes: task.estimated_minutes,
            actual_minutes,
        });
    }

    outcome.accepted.push(block);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Difficulty;
    use proptest::prelude::*;

    fn sample_task(id: &str, estimated_minutes: u32) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            estimated_minutes,
            difficulty: Difficulty::Medium,
            goal_id: None,
            notes: None,
        }
    }

    fn raw_block(task: Option<&str>, start: Option<&str>, end: Option<&str>) -> RawPlanBlock {
        RawPlanBlock {
            task: task.map(ToOwned::to_owned),
            start: start.map(ToOwned::to_owned),
            end: end.map(ToOwned::to_owned),
            note: None,
        }
    }

    fn raw_days(entries: Vec<(&str, Vec<RawPlanBlock>)>) -> RawPlanDays {
        RawPlanDays {
            days: entries
                .into_iter()
                .map(|(day, blocks)| (day.to_string(), blocks))
                .collect(),
        }
    }

    #[test]
    fn valid_candidate_is_accepted_with_parsed_times() {
        let tasks = vec![sample_task("tsk-1", 60)];
        let raw = raw_days(vec![(
            "Monday",
            vec![raw_block(Some("tsk-1"), Some("09:00"), Some("10:00"))],
        )]);

        let outcome = map_plan_response(&raw, &tasks);
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.rejected.is_empty());
        assert!(outcome.deviations.is_empty());

        let block = &outcome.accepted[0];
        assert_eq!(block.task_id, "tsk-1");
        assert_eq!(block.weekday, Weekday::Mon);
        assert_eq!(block.duration_minutes(), 60);
    }

    #[test]
    fn unknown_task_reference_is_dropped_with_reason() {
        let tasks = vec![sample_task("tsk-1", 60)];
        let raw = raw_days(vec![(
            "Monday",
            vec![raw_block(Some("tsk-ghost"), Some("09:00"), Some("10:00"))],
        )]);

        let outcome = map_plan_response(&raw, &tasks);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].reason.contains("unknown task reference"));
    }

    #[test]
    fn malformed_times_and_reversed_ranges_are_rejected() {
        let tasks = vec![sample_task("tsk-1", 60)];
        let raw = raw_days(vec![(
            "Tuesday",
            vec![
                raw_block(Some("tsk-1"), Some("9 am"), Some("10:00")),
                raw_block(Some("tsk-1"), Some("10:00"), Some("09:00")),
                raw_block(Some("tsk-1"), Some("10:00"), Some("10:00")),
                raw_block(Some("tsk-1"), None, Some("10:00")),
                raw_block(None, Some("09:00"), Some("10:00")),
            ],
        )]);

        let outcome = map_plan_response(&raw, &tasks);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected.len(), 5);
    }

    #[test]
    fn unknown_weekday_keys_reject_their_entries() {
        let tasks = vec![sample_task("tsk-1", 30)];
        let raw = raw_days(vec![
            (
                "Funday",
                vec![raw_block(Some("tsk-1"), Some("09:00"), Some("09:30"))],
            ),
            (
                "friday",
                vec![raw_block(Some("tsk-1"), Some("09:00"), Some("09:30"))],
            ),
        ]);

        let outcome = map_plan_response(&raw, &tasks);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].weekday, Weekday::Fri);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].reason.contains("unknown weekday"));
    }

    #[test]
    fn duration_deviation_is_recorded_not_fatal() {
        let tasks = vec![sample_task("tsk-1", 90)];
        let raw = raw_days(vec![(
            "Wednesday",
            vec![raw_block(Some("tsk-1"), Some("14:00"), Some("15:00"))],
        )]);

        let outcome = map_plan_response(&raw, &tasks);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.deviations.len(), 1);
        assert_eq!(outcome.deviations[0].expected_minutes, 90);
        assert_eq!(outcome.deviations[0].actual_minutes, 60);
    }

    #[test]
    fn days_are_walked_monday_through_sunday() {
        let tasks = vec![sample_task("tsk-1", 30)];
        let entry = raw_block(Some("tsk-1"), Some("08:00"), Some("08:30"));
        let raw = raw_days(vec![
            ("Sunday", vec![entry.clone()]),
            ("Monday", vec![entry.clone()]),
            ("Friday", vec![entry]),
        ]);

        let outcome = map_plan_response(&raw, &tasks);
        let order: Vec<Weekday> = outcome
            .accepted
            .iter()
            .map(|block| block.weekday)
            .collect();
        assert_eq!(order, vec![Weekday::Mon, Weekday::Fri, Weekday::Sun]);
    }

    fn raw_block_strategy() -> impl Strategy<Value = RawPlanBlock> {
        let field = proptest::option::of(prop_oneof![
            Just("tsk-1".to_string()),
            Just("tsk-ghost".to_string()),
            Just("09:00".to_string()),
            Just("24:99".to_string()),
            Just("10:30".to_string()),
            Just(String::new()),
        ]);
        (field.clone(), field.clone(), field).prop_map(|(task, start, end)| RawPlanBlock {
            task,
            start,
            end,
            note: None,
        })
    }

    proptest! {
        #[test]
        fn accepted_plus_rejected_equals_total_received(
            monday in proptest::collection::vec(raw_block_strategy(), 0..8),
            misc in proptest::collection::vec(raw_block_strategy(), 0..8),
        ) {
            let tasks = vec![sample_task("tsk-1", 90)];
            let total = monday.len() + misc.len();
            let raw = RawPlanDays {
                days: BTreeMap::from([
                    ("Monday".to_string(), monday),
                    ("Someday".to_string(), misc),
                ]),
            };

            let outcome = map_plan_response(&raw, &tasks);
            prop_assert_eq!(outcome.accepted.len() + outcome.rejected.len(), total);
        }
    }
}
