use chrono::{DateTime, Duration, Utc};

use crate::models::block::TimeBlock;
use crate::models::event::Event;

pub struct AvailabilityService;

impl AvailabilityService {
    // Partitions [range_start, range_end) into contiguous blocks of
    // `block_minutes`, marks each one busy when an opaque event
    // intersects it, and grades its load. The final block is truncated
    // to the range end when the range is not evenly divisible.
    pub fn aggregate(
        events: &[Event],
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        block_minutes: i64,
    ) -> Vec<TimeBlock> {
        let mut blocks = Self::create_blocks(range_start, range_end, block_minutes);
        Self::assign_events(events, &mut blocks);
        for block in blocks.iter_mut() {
            block.classify();
        }
        blocks
    }

    pub fn create_blocks(
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        block_minutes: i64,
    ) -> Vec<TimeBlock> {
        // A non-positive block size would never advance the loop.
        if block_minutes <= 0 {
            return Vec::new();
        }
        let block_length = Duration::minutes(block_minutes);
        let mut blocks = Vec::new();
        let mut block_start = range_start;
        while block_start < range_end {
            let block_end = (block_start + block_length).min(range_end);
            blocks.push(TimeBlock::new(block_start, block_end));
            block_start = block_end;
        }
        blocks
    }

    // There are typically far more blocks than events, so walk the events
    // and touch only the blocks each one can reach.
    fn assign_events(events: &[Event], blocks: &mut [TimeBlock]) {
        for event in events {
            for block in blocks.iter_mut() {
                if event.overlaps(block.start, block.end) {
                    block.assign(event);
                }
            }
        }
    }
}
