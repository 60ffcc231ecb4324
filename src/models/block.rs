use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::event::Event;

// Busy-ratio cutoffs: at most 20% assigned is a low block, above 75% is
// a high one.
const LOW_THRESHOLD: f64 = 0.20;
const HIGH_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockState {
    Free,
    Busy,
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockState::Free => write!(f, "free"),
            BlockState::Busy => write!(f, "busy"),
        }
    }
}

// How loaded a block is, graded by the ratio of busy time to block
// length. Blocks tagged Leave or Off are not working time at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockLoad {
    Low,
    Medium,
    High,
    Unavailable,
}

impl std::fmt::Display for BlockLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockLoad::Low => write!(f, "low"),
            BlockLoad::Medium => write!(f, "medium"),
            BlockLoad::High => write!(f, "high"),
            BlockLoad::Unavailable => write!(f, "unavailable"),
        }
    }
}

// One fixed-size subdivision of the requested range. Blocks start free
// and flip busy when an opaque event is assigned to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub state: BlockState,
    pub busy_minutes: i64,
    pub load: BlockLoad,
    pub categories: Vec<String>,
}

impl TimeBlock {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            state: BlockState::Free,
            busy_minutes: 0,
            load: BlockLoad::Low,
            categories: Vec::new(),
        }
    }

    pub fn length_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    // Accumulate the overlapping span of an opaque event. Transparent
    // events contribute nothing to busy time and leave the block free,
    // but their categories are still collected for classification.
    pub fn assign(&mut self, event: &Event) {
        if !event.overlaps(self.start, self.end) {
            return;
        }
        for category in &event.categories {
            if !self.categories.contains(category) {
                self.categories.push(category.clone());
            }
        }
        if !event.status.occupies_time() {
            return;
        }
        let overlap_start = self.start.max(event.start);
        let overlap_end = self.end.min(event.end);
        self.busy_minutes += (overlap_end - overlap_start).num_minutes();
        if self.busy_minutes > self.length_minutes() {
            self.busy_minutes = self.length_minutes();
        }
        self.state = BlockState::Busy;
    }

    // Grade the block once all events are assigned. Leave/Off blocks are
    // unavailable regardless of how much time is booked.
    pub fn classify(&mut self) {
        let not_work = self.categories.iter().any(|c| c == "Leave" || c == "Off");
        if not_work {
            self.load = BlockLoad::Unavailable;
            return;
        }
        let length = self.length_minutes();
        let assigned = if length > 0 {
            self.busy_minutes as f64 / length as f64
        } else {
            0.0
        };
        self.load = if assigned > HIGH_THRESHOLD {
            BlockLoad::High
        } else if assigned > LOW_THRESHOLD {
            BlockLoad::Medium
        } else {
            BlockLoad::Low
        };
    }
}
