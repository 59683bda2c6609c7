//! TUI mode

/// Run the terminal dashboard
pub async fn run_tui(token: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    crate::interfaces::tui::run_tui(token).await
}
