// src/handlers/mod.rs

pub mod chat_settings;
pub mod feedback;
pub mod report;
