use crate::domain::models::{BusySlot, ScheduledBlock, WeeklySchedule, WEEKDAYS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusyConflict {
    pub block: ScheduledBlock,
    pub busy: BusySlot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockConflict {
    pub first: ScheduledBlock,
    pub second: ScheduledBlock,
}

/// Derived per generation run; recomputed whenever a schedule is produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictReport {
    pub busy_conflicts: Vec<BusyConflict>,
    pub block_conflicts: Vec<BlockConflict>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.busy_conflicts.is_empty() && self.block_conflicts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.busy_conflicts.len() + self.block_conflicts.len()
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.total());
        for conflict in &self.busy_conflicts {
            lines.push(format!(
                "task {} at {} overlaps busy time {}",
                conflict.block.task_id,
                conflict.block.interval(),
                conflict.busy,
            ));
        }
        for conflict in &self.block_conflicts {
            lines.push(format!(
                "task {} at {} overlaps task {} at {}",
                conflict.first.task_id,
                conflict.first.interval(),
                conflict.second.task_id,
                conflict.second.interval(),
            ));
        }
        lines
    }
}

/// Pairwise overlap scan, grouped by weekday. Each unordered block pair is
/// reported once; output order is weekday, then the first element's start.
pub fn find_conflicts(schedule: &WeeklySchedule, busy_slots: &[BusySlot]) -> ConflictReport {
    let mut report = ConflictReport::default();

    for weekday in WEEKDAYS {
        let blocks: Vec<&ScheduledBlock> = schedule.blocks_for(weekday).collect();
        if blocks.is_empty() {
            continue;
        }

        let mut busy: Vec<&BusySlot> = busy_slots
            .iter()
            .filter(|slot| slot.weekday == weekday)
            .collect();
        busy.sort();

        for block in &blocks {
            for slot in &busy {
                if block.interval().overlaps(slot) {
                    report.busy_conflicts.push(BusyConflict {
                        block: (*block).clone(),
                        busy: **slot,
                    });
                }
            }
        }

        for (index, first) in blocks.iter().enumerate() {
            for second in blocks.iter().skip(index + 1) {
                if first.interval().overlaps(&second.interval()) {
                    report.block_conflicts.push(BlockConflict {
                        first: (*first).clone(),
                        second: (*second).clone(),
                    });
                }
            }
        }
    }

    report
}
