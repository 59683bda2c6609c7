//! Terminal dashboard
//!
//! 与 /admin/dashboard 使用同一套调度器语义：进入时激活，退出时停用。

use std::io::{self, Stderr};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::{Stream, StreamExt};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::time::MissedTickBehavior;

mod app;
mod ui;

pub use app::{App, KeyOutcome};

use crate::analytics::{Aggregator, RefreshScheduler};
use crate::services::{SessionProvider, StaticTokenSessions};
use crate::storage::StorageFactory;

/// 重绘间隔，倒计时按秒变化
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Run the terminal dashboard
pub async fn run_tui(token: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = crate::config::get_config();

    let sessions = StaticTokenSessions::new(config.auth.admin_token.clone());
    if !sessions.is_enabled() {
        return Err("Operator dashboard is disabled (auth.admin_token is empty)".into());
    }
    let Some(session) = sessions.current_session(token.as_deref()) else {
        return Err("Invalid or missing operator token".into());
    };

    let store = StorageFactory::create().await?;
    let aggregator = Arc::new(Aggregator::new(
        store,
        config.analytics.recent_events_limit,
    ));
    let scheduler = Arc::new(RefreshScheduler::new(
        aggregator,
        Duration::from_secs(config.analytics.refresh_interval_secs),
    ));

    // Setup terminal
    enable_raw_mode()?;
    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stderr);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(scheduler, session.operator);
    app.enter();
    let res = run_app(&mut terminal, &mut app).await;
    app.leave();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    app: &mut App,
) -> io::Result<()> {
    run_loop(app, EventStream::new(), |app| {
        terminal.draw(|f| ui::ui(f, app)).map(|_| ())
    })
    .await
}

/// 等待按键与重绘都在 await 上，调度器的定时任务在同一 runtime 上照常推进
async fn run_loop<S, F>(app: &mut App, mut events: S, mut redraw: F) -> io::Result<()>
where
    S: Stream<Item = io::Result<Event>> + Unpin,
    F: FnMut(&App) -> io::Result<()>,
{
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        redraw(&*app)?;

        tokio::select! {
            _ = ticker.tick() => {}
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app.handle_key(key.code) {
                        KeyOutcome::Continue => {}
                        KeyOutcome::Refresh => app.refresh().await,
                        KeyOutcome::Quit => return Ok(()),
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                // 输入流结束
                None => return Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::DashboardSnapshot;
    use crate::storage::MemoryEventStore;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use futures_util::stream;

    fn app() -> App {
        let store = Arc::new(MemoryEventStore::new());
        let aggregator = Arc::new(Aggregator::new(store, 10));
        let scheduler = Arc::new(RefreshScheduler::new(aggregator, Duration::from_secs(5)));
        App::new(scheduler, "admin".to_string())
    }

    /// 在 `after` 之后按下一个键，然后输入结束
    fn key_after(after: Duration, code: KeyCode) -> impl Stream<Item = io::Result<Event>> + Unpin {
        Box::pin(stream::once(async move {
            tokio::time::sleep(after).await;
            Ok(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_while_waiting_for_input() {
        let mut app = app();
        app.enter();

        let mut frames: Vec<DashboardSnapshot> = Vec::new();
        let events = key_after(Duration::from_millis(3400), KeyCode::Char('q'));
        run_loop(&mut app, events, |app| {
            frames.push(app.snapshot());
            Ok(())
        })
        .await
        .unwrap();

        let last = frames.last().unwrap();
        assert!(last.last_summary.is_some());
        assert!(!last.is_refreshing);
        // 最后一帧在 3.25s，倒计时已走到 2
        assert_eq!(last.seconds_until_next_refresh, 2);
        assert!(frames.len() > 10);
        assert!(!app.snapshot().active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_key_refreshes() {
        let mut app = app();
        app.enter();

        let events = key_after(Duration::from_millis(1200), KeyCode::Char('r'));
        run_loop(&mut app, events, |_| Ok(())).await.unwrap();

        assert_eq!(app.status_message, "Refreshed");
        assert!(app.snapshot().active);
        app.leave();
    }
}
