pub mod job;
pub mod sync_report;
