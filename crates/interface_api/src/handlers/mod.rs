//! Request handlers

pub mod cron;
pub mod admin;
pub mod health;
