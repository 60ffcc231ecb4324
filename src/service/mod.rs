pub mod availability_service;
pub mod calendar_service;
pub mod report_service;
