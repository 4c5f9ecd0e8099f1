use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeInterval {
    #[serde(with = "weekday_serde")]
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A user-declared interval of unavailability; owned by the availability
/// editor, read-only to the core.
pub type BusySlot = TimeInterval;

impl TimeInterval {
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            weekday,
            start,
            end,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.start >= self.end {
            return Err("interval start must be before interval end".to_string());
        }
        Ok(())
    }

    /// Half-open overlap test: zero-length intervals overlap nothing.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.weekday == other.weekday && self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    fn sort_key(&self) -> (u32, NaiveTime, NaiveTime) {
        (self.weekday.num_days_from_monday(), self.start, self.end)
    }
}

impl PartialOrd for TimeInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            weekday_name(self.weekday),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub estimated_minutes: u32,
    pub difficulty: Difficulty,
    pub goal_id: Option<String>,
    pub notes: Option<String>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if self.estimated_minutes == 0 {
            return Err("task.estimated_minutes must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl Goal {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "goal.id")?;
        validate_non_empty(&self.title, "goal.title")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledBlock {
    pub task_id: String,
    #[serde(with = "weekday_serde")]
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub note: Option<String>,
}

impl ScheduledBlock {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.task_id, "block.task_id")?;
        self.interval().validate()
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.weekday, self.start, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        self.interval().duration_minutes()
    }
}

/// One generation run's worth of blocks, always sorted by weekday then
/// start time. Superseded wholesale by the next run, never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklySchedule {
    blocks: Vec<ScheduledBlock>,
}

impl WeeklySchedule {
    pub fn from_blocks(mut blocks: Vec<ScheduledBlock>) -> Self {
        blocks.sort_by(|a, b| {
            a.interval()
                .cmp(&b.interval())
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        Self { blocks }
    }

    pub fn blocks(&self) -> &[ScheduledBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks_for(&self, weekday: Weekday) -> impl Iterator<Item = &ScheduledBlock> {
        self.blocks
            .iter()
            .filter(move |block| block.weekday == weekday)
    }
}

/// Recorded when a block's length strays from the task's estimate; the
/// schedule is kept as returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DurationDeviation {
    pub task_id: String,
    #[serde(with = "weekday_serde")]
    pub weekday: Weekday,
    pub expected_minutes: u32,
    pub actual_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderEvent {
    pub fires_at: DateTime<Utc>,
    pub block: ScheduledBlock,
    pub message: String,
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .copied()
        .find(|weekday| weekday_name(*weekday).eq_ignore_ascii_case(value.trim()))
}

pub(crate) mod weekday_serde {
    use super::{parse_weekday, weekday_name};
    use chrono::Weekday;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(weekday_name(*weekday))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_weekday(&raw).ok_or_else(|| D::Error::custom(format!("unknown weekday '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn time_from_minutes(minutes: u32) -> NaiveTime {
        time(minutes / 60, minutes % 60)
    }

    fn sample_task() -> Task {
        Task {
            id: "tsk-1".to_string(),
            title: "Write report".to_string(),
            estimated_minutes: 60,
            difficulty: Difficulty::Medium,
            goal_id: Some("gol-1".to_string()),
            notes: None,
        }
    }

    fn sample_block() -> ScheduledBlock {
        ScheduledBlock {
            task_id: "tsk-1".to_string(),
            weekday: Weekday::Mon,
            start: time(9, 0),
            end: time(10, 0),
            note: Some("first draft".to_string()),
        }
    }

    #[test]
    fn interval_validate_rejects_reversed_and_empty_ranges() {
        let mut interval = TimeInterval::new(Weekday::Tue, time(9, 0), time(10, 0));
        assert!(interval.validate().is_ok());

        interval.end = interval.start;
        assert!(interval.validate().is_err());

        interval.end = time(8, 0);
        assert!(interval.validate().is_err());
    }

    #[test]
    fn task_validate_rejects_zero_duration_and_blank_title() {
        let mut task = sample_task();
        assert!(task.validate().is_ok());

        task.estimated_minutes = 0;
        assert!(task.validate().is_err());

        task.estimated_minutes = 30;
        task.title = "  ".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn block_validate_requires_task_and_ordered_times() {
        let mut block = sample_block();
        assert!(block.validate().is_ok());

        block.task_id = String::new();
        assert!(block.validate().is_err());

        block.task_id = "tsk-1".to_string();
        block.end = block.start;
        assert!(block.validate().is_err());
    }

    #[test]
    fn weekly_schedule_sorts_by_weekday_then_start() {
        let mut early = sample_block();
        early.weekday = Weekday::Mon;
        early.start = time(8, 0);
        early.end = time(9, 0);

        let mut late = sample_block();
        late.weekday = Weekday::Wed;

        let schedule = WeeklySchedule::from_blocks(vec![late.clone(), sample_block(), early.clone()]);
        assert_eq!(schedule.blocks()[0], early);
        assert_eq!(schedule.blocks()[1], sample_block());
        assert_eq!(schedule.blocks()[2], late);
        assert_eq!(schedule.blocks_for(Weekday::Mon).count(), 2);
    }

    #[test]
    fn weekday_names_round_trip() {
        for weekday in WEEKDAYS {
            assert_eq!(parse_weekday(weekday_name(weekday)), Some(weekday));
        }
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Funday"), None);
    }

    #[test]
    fn interval_display_uses_day_name_and_hhmm() {
        let interval = TimeInterval::new(Weekday::Fri, time(15, 0), time(16, 30));
        assert_eq!(interval.to_string(), "Friday 15:00-16:30");
    }

    fn minute_strategy() -> impl Strategy<Value = u32> {
        0u32..1440
    }

    proptest! {
        #[test]
        fn intervals_on_different_weekdays_never_overlap(
            day_a in 0usize..7,
            day_b in 0usize..7,
            start_a in minute_strategy(),
            len_a in 0u32..240,
            start_b in minute_strategy(),
            len_b in 0u32..240,
        ) {
            prop_assume!(day_a != day_b);
            let a = TimeInterval::new(
                WEEKDAYS[day_a],
                time_from_minutes(start_a),
                time_from_minutes((start_a + len_a).min(1439)),
            );
            let b = TimeInterval::new(
                WEEKDAYS[day_b],
                time_from_minutes(start_b),
                time_from_minutes((start_b + len_b).min(1439)),
            );
            prop_assert!(!a.overlaps(&b));
        }

        #[test]
        fn interval_self_overlap_iff_nonempty(
            day in 0usize..7,
            start in minute_strategy(),
            len in 0u32..240,
        ) {
            let interval = TimeInterval::new(
                WEEKDAYS[day],
                time_from_minutes(start),
                time_from_minutes((start + len).min(1439)),
            );
            prop_assert_eq!(interval.overlaps(&interval), interval.start < interval.end);
        }

        #[test]
        fn interval_overlap_is_symmetric(
            day_a in 0usize..7,
            day_b in 0usize..7,
            start_a in minute_strategy(),
            len_a in 0u32..240,
            start_b in minute_strategy(),
            len_b in 0u32..240,
        ) {
            let a = TimeInterval::new(
                WEEKDAYS[day_a],
                time_from_minutes(start_a),
                time_from_minutes((start_a + len_a).min(1439)),
            );
            let b = TimeInterval::new(
                WEEKDAYS[day_b],
                time_from_minutes(start_b),
                time_from_minutes((start_b + len_b).min(1439)),
            );
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}
