use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Busy,
    Free,
    Tentative,
}

impl EventStatus {
    // Transparent events are shown as "Free" in the calendar, so they
    // never consume block time.
    pub fn occupies_time(&self) -> bool {
        !matches!(self, EventStatus::Free)
    }
}

// A single timed calendar entry, immutable once parsed. Events only
// feed the aggregator; reports serialize blocks, never events.
#[derive(Debug, Clone)]
pub struct Event {
    pub uid: String,
    pub summary: String,
    pub location: String,
    pub categories: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: EventStatus,
}

impl Event {
    pub fn length(&self) -> chrono::Duration {
        self.end - self.start
    }

    // Half-open interval intersection with [start, end).
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}
