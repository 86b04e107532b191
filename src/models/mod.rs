// src/models/mod.rs

pub mod answer;
pub mod chat_settings;
pub mod feedback;
pub mod item;
pub mod person;
pub mod questionnaire;
pub mod result;
