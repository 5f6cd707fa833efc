//! Healing leaderboards from classic WoW combat logs.
//!
//! `parser` turns a log file into typed events, `scoring` ranks the healers
//! of one report, and `service` + `api` expose uploaded reports over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod scoring;
pub mod service;
pub mod store;
