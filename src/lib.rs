pub mod admin;
pub mod api;
pub mod config;
pub mod course_detail;
pub mod error;
pub mod forms;
pub mod models;
pub mod period_editor;
pub mod registration;
pub mod session;
pub mod submission;
pub mod viewer;
