pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod response;
pub mod state;
pub mod students;
pub mod telemetry;
pub mod users;
pub mod validation;
