//! CSV plumbing for the batch driver.

pub mod operation_reader;
pub mod report_writer;
