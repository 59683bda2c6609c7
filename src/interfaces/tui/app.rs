use std::sync::Arc;

use crossterm::event::KeyCode;

use crate::analytics::{DashboardSnapshot, RefreshOutcome, RefreshScheduler};

/// 按键处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Refresh,
    Quit,
}

pub struct App {
    scheduler: Arc<RefreshScheduler>,
    pub operator: String,
    pub status_message: String,
    pub error_message: String,
}

impl App {
    pub fn new(scheduler: Arc<RefreshScheduler>, operator: String) -> Self {
        Self {
            scheduler,
            operator,
            status_message: String::new(),
            error_message: String::new(),
        }
    }

    /// 进入看板
    pub fn enter(&mut self) {
        self.scheduler.activate();
        self.status_message = "Dashboard opened".to_string();
    }

    /// 离开看板，之后不再触发任何汇总
    pub fn leave(&mut self) {
        self.scheduler.deactivate();
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.scheduler.snapshot()
    }

    pub fn handle_key(&mut self, code: KeyCode) -> KeyOutcome {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.leave();
                KeyOutcome::Quit
            }
            KeyCode::Char('r') | KeyCode::F(5) => KeyOutcome::Refresh,
            _ => KeyOutcome::Continue,
        }
    }

    pub async fn refresh(&mut self) {
        match self.scheduler.refresh_now().await {
            RefreshOutcome::Refreshed => {
                self.error_message.clear();
                self.status_message = "Refreshed".to_string();
            }
            RefreshOutcome::Failed => {
                self.status_message.clear();
                self.error_message = "Refresh failed, showing previous data".to_string();
            }
            RefreshOutcome::Inactive => {
                self.status_message.clear();
                self.error_message = "Dashboard is not active".to_string();
            }
        }
    }
}
