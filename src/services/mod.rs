pub mod failure_writer;
pub mod grading_service;
pub mod report_writer;

pub use failure_writer::FailureWriter;
pub use grading_service::{compute_final_grade, parse_criterion, parse_reply, GradingService};
pub use report_writer::ReportWriter;
