use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use crate::analytics::RefreshScheduler;

/// 等待 Ctrl+C，然后停止看板定时任务
pub async fn listen_for_shutdown(scheduler: Arc<RefreshScheduler>) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    scheduler.deactivate();
    info!("Dashboard timers stopped, shutting down...");
}
