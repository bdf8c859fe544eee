//! # EdMap API Library
//!
//! This library provides the core functionality for the EdMap API service,
//! including handlers, models, providers, and server configuration.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod graph;
pub mod handlers;
pub mod ics;
pub mod models;
pub mod providers;
pub mod repositories;
pub mod server;
pub mod sync;
pub mod telemetry;
pub use migration;
