//! linkpulse - visitor and outbound-click analytics
//!
//! Records page visits and outbound link clicks, enriches them with client
//! and network information, and serves a periodically refreshed operator
//! dashboard.
//!
//! # Features
//! - **server**: HTTP tracking and dashboard endpoints (default)
//! - **tui**: Terminal dashboard
//!
//! # Architecture
//! - `analytics`: Recorder, Aggregator and the dashboard refresh scheduler
//! - `services`: User-agent classification, GeoIP chain, enrichment, sessions
//! - `storage`: Event store backends (sea-orm, in-memory)
//! - `api`: HTTP services and middleware
//! - `interfaces`: User interfaces (CLI, TUI)
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
