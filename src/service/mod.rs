pub mod error;
pub mod job_service;
pub mod storage;
