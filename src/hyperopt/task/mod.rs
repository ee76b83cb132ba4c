pub mod batch_job;
pub mod session_runner;
