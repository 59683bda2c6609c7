//! 看板刷新调度
//!
//! 激活后：
//! - 立即做一次"显式"刷新（isRefreshing = true）
//! - 数据定时器每 `interval` 静默刷新一次
//! - 倒计时定时器每秒减一，到 0 时回到 `interval`
//!
//! 手动刷新会把两个定时器都重新对齐到刷新时刻。
//!
//! 停用后两个定时器都被取消，不会再调用汇总。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

use super::aggregator::{AnalyticsSummary, SummarySource};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// 保留上一次的汇总
    Failed,
    /// 调度器未激活，没有调用汇总
    Inactive,
}

/// 看板当前状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub active: bool,
    pub is_refreshing: bool,
    pub seconds_until_next_refresh: u64,
    pub last_summary: Option<AnalyticsSummary>,
    pub last_error: Option<String>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub country_count: usize,
    pub referrer_count: usize,
}

struct SchedulerState {
    active: AtomicBool,
    last_summary: ArcSwapOption<AnalyticsSummary>,
    loud_in_flight: AtomicUsize,
    countdown: AtomicU64,
    last_error: Mutex<Option<String>>,
    last_refreshed_at: Mutex<Option<DateTime<Utc>>>,
    data_reset: Notify,
    countdown_reset: Notify,
}

impl SchedulerState {
    fn tick_countdown(&self, interval_secs: u64) {
        let _ = self
            .countdown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                Some(if s <= 1 { interval_secs } else { s - 1 })
            });
    }
}

/// 显式刷新（isRefreshing）计数，任务被取消时也会归还
struct LoudGuard(Arc<SchedulerState>);

impl LoudGuard {
    fn enter(state: &Arc<SchedulerState>) -> Self {
        state.loud_in_flight.fetch_add(1, Ordering::AcqRel);
        Self(state.clone())
    }
}

impl Drop for LoudGuard {
    fn drop(&mut self) {
        self.0.loud_in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

struct ScheduledTasks {
    initial: JoinHandle<()>,
    data: JoinHandle<()>,
    countdown: JoinHandle<()>,
}

impl ScheduledTasks {
    fn abort(self) {
        self.initial.abort();
        self.data.abort();
        self.countdown.abort();
    }
}

/// 看板刷新调度器，持有两个定时任务的生命周期
pub struct RefreshScheduler {
    source: Arc<dyn SummarySource>,
    interval: Duration,
    state: Arc<SchedulerState>,
    tasks: Mutex<Option<ScheduledTasks>>,
}

impl RefreshScheduler {
    /// `interval` 不足 1 秒时按 1 秒处理
    pub fn new(source: Arc<dyn SummarySource>, interval: Duration) -> Self {
        let interval = interval.max(COUNTDOWN_TICK);
        Self {
            source,
            interval,
            state: Arc::new(SchedulerState {
                active: AtomicBool::new(false),
                last_summary: ArcSwapOption::empty(),
                loud_in_flight: AtomicUsize::new(0),
                countdown: AtomicU64::new(interval.as_secs()),
                last_error: Mutex::new(None),
                last_refreshed_at: Mutex::new(None),
                data_reset: Notify::new(),
                countdown_reset: Notify::new(),
            }),
            tasks: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn interval_secs(&self) -> u64 {
        self.interval.as_secs()
    }

    /// 激活：初次刷新 + 启动两个定时器。已激活时不做任何事。
    ///
    /// 必须在 tokio runtime 内调用。
    pub fn activate(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.is_some() {
            return;
        }

        self.state.active.store(true, Ordering::Release);
        self.state
            .countdown
            .store(self.interval_secs(), Ordering::Release);

        let initial = {
            let (source, state) = (self.source.clone(), self.state.clone());
            // 在返回前就进入 isRefreshing
            let loud = LoudGuard::enter(&state);
            tokio::spawn(async move {
                run_refresh(source.as_ref(), &state, Some(loud)).await;
            })
        };

        let data = {
            let (source, state) = (self.source.clone(), self.state.clone());
            let period = self.interval;
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            run_refresh(source.as_ref(), &state, None).await;
                        }
                        _ = state.data_reset.notified() => ticker.reset(),
                    }
                }
            })
        };

        let countdown = {
            let state = self.state.clone();
            let interval_secs = self.interval_secs();
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => state.tick_countdown(interval_secs),
                        _ = state.countdown_reset.notified() => ticker.reset(),
                    }
                }
            })
        };

        *tasks = Some(ScheduledTasks {
            initial,
            data,
            countdown,
        });
        info!(
            "Dashboard refresh activated (every {}s)",
            self.interval_secs()
        );
    }

    /// 停用：取消所有定时任务
    pub fn deactivate(&self) {
        self.state.active.store(false, Ordering::Release);
        if let Some(tasks) = self.tasks.lock().take() {
            tasks.abort();
            info!("Dashboard refresh deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::Acquire)
    }

    /// 手动刷新（显式），下一次静默刷新从此刻起重新计时
    pub async fn refresh_now(&self) -> RefreshOutcome {
        if !self.is_active() {
            return RefreshOutcome::Inactive;
        }
        self.state
            .countdown
            .store(self.interval_secs(), Ordering::Release);
        // notify_one 会保留许可，定时任务正忙时也不会丢
        self.state.data_reset.notify_one();
        self.state.countdown_reset.notify_one();
        let loud = LoudGuard::enter(&self.state);
        run_refresh(self.source.as_ref(), &self.state, Some(loud)).await
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.loud_in_flight.load(Ordering::Acquire) > 0
    }

    pub fn seconds_until_next_refresh(&self) -> u64 {
        self.state.countdown.load(Ordering::Acquire)
    }

    pub fn last_summary(&self) -> Option<Arc<AnalyticsSummary>> {
        self.state.last_summary.load_full()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let summary = self.last_summary();
        DashboardSnapshot {
            active: self.is_active(),
            is_refreshing: self.is_refreshing(),
            seconds_until_next_refresh: self.seconds_until_next_refresh(),
            country_count: summary.as_ref().map_or(0, |s| s.country_count()),
            referrer_count: summary.as_ref().map_or(0, |s| s.referrer_count()),
            last_summary: summary.map(|s| (*s).clone()),
            last_error: self.state.last_error.lock().clone(),
            last_refreshed_at: *self.state.last_refreshed_at.lock(),
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(tasks) = self.tasks.get_mut().take() {
            tasks.abort();
        }
    }
}

/// `loud` 为 None 时是静默刷新，不影响 isRefreshing
async fn run_refresh(
    source: &dyn SummarySource,
    state: &SchedulerState,
    loud: Option<LoudGuard>,
) -> RefreshOutcome {
    if !state.active.load(Ordering::Acquire) {
        return RefreshOutcome::Inactive;
    }

    let silent = loud.is_none();
    match source.compute_summary().await {
        Ok(summary) => {
            debug!(
                "Dashboard refreshed (silent: {}): {} events",
                silent,
                summary.total_events()
            );
            // 并发刷新时后完成者覆盖
            state.last_summary.store(Some(Arc::new(summary)));
            *state.last_error.lock() = None;
            *state.last_refreshed_at.lock() = Some(Utc::now());
            RefreshOutcome::Refreshed
        }
        Err(e) => {
            error!("Dashboard refresh failed, keeping last summary: {}", e);
            *state.last_error.lock() = Some(e.to_string());
            RefreshOutcome::Failed
        }
    }
}
