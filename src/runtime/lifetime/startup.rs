//! 启动准备：存储、富化、记录、汇总、调度器、会话

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analytics::{Aggregator, Recorder, RefreshScheduler};
use crate::config::StaticConfig;
use crate::services::{Enricher, SessionProvider, StaticTokenSessions};
use crate::storage::{EventStore, StorageFactory};

/// 服务运行所需的共享组件
#[derive(Clone)]
pub struct StartupContext {
    pub store: Arc<dyn EventStore>,
    pub recorder: Recorder,
    pub aggregator: Arc<Aggregator>,
    pub scheduler: Arc<RefreshScheduler>,
    pub sessions: Arc<dyn SessionProvider>,
}

impl StartupContext {
    /// 用已有存储和配置组装组件（不做 IO）
    pub fn assemble(store: Arc<dyn EventStore>, config: &StaticConfig) -> Self {
        let enricher = Enricher::new(&config.analytics);
        Self::with_enricher(store, enricher, config)
    }

    pub fn with_enricher(
        store: Arc<dyn EventStore>,
        enricher: Enricher,
        config: &StaticConfig,
    ) -> Self {
        let recorder = Recorder::new(enricher, store.clone());
        let aggregator = Arc::new(Aggregator::new(
            store.clone(),
            config.analytics.recent_events_limit,
        ));
        let scheduler = Arc::new(RefreshScheduler::new(
            aggregator.clone(),
            Duration::from_secs(config.analytics.refresh_interval_secs),
        ));
        let sessions: Arc<dyn SessionProvider> =
            Arc::new(StaticTokenSessions::new(config.auth.admin_token.clone()));

        Self {
            store,
            recorder,
            aggregator,
            scheduler,
            sessions,
        }
    }
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = crate::config::get_config();

    let store = StorageFactory::create()
        .await
        .context("Failed to create event store")?;
    info!("Using event store backend: {}", store.backend_name());

    if !config.analytics.enable_geo_lookup {
        info!("GeoIP lookup disabled, network fields will be Unknown");
    }

    let ctx = StartupContext::assemble(store, &config);

    if ctx.sessions.is_enabled() {
        info!("Operator dashboard available at /admin/dashboard");
    } else {
        warn!("auth.admin_token is empty, operator dashboard is disabled");
    }

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(ctx)
}
