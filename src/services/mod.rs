// src/services/mod.rs

pub mod aggregator;
pub mod feedback_cache;
pub mod generator;
pub mod grader;
pub mod jobs;
pub mod prompt;
pub mod report;
