pub mod job_runner;
pub mod orchestrator;
pub mod task;
pub mod worker;
