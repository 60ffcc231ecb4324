use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::block::TimeBlock;

// Result of one invocation: the block partition plus enough metadata to
// tell where and when it came from. Written once, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub block_minutes: i64,
    pub blocks: Vec<TimeBlock>,
}

impl Report {
    pub fn new(source: &str, block_minutes: i64, blocks: Vec<TimeBlock>) -> Self {
        Self {
            source: source.to_string(),
            generated_at: Utc::now(),
            block_minutes,
            blocks,
        }
    }
}
