//! Execution modes

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "server")]
pub use server::{configure_app, run_server};

#[cfg(feature = "tui")]
pub use tui::run_tui;
