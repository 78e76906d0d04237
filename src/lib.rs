//! Job listing feed and résumé compilation service.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
