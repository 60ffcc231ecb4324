pub mod block;
pub mod event;
pub mod report;
