//! 事件记录
//!
//! 尽力而为：富化失败降级为默认值，存储失败只记日志，调用方永远拿不到错误。

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{
    DIRECT_REFERRER, NewClickEvent, PAGE_VISIT_SLUG, PLACEHOLDER_URL, UNKNOWN, or_default,
};
use crate::services::{ClientContext, Enricher, Enrichment};
use crate::storage::EventStore;

/// 一次记录的结果，仅用于观测和测试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// 占位链接或保留 slug，未写入
    Skipped,
    /// 存储写入失败（已记录日志）
    Failed,
}

/// 不可跳转的占位链接（`#` 或空串）
pub fn is_placeholder(url: &str) -> bool {
    let url = url.trim();
    url.is_empty() || url == PLACEHOLDER_URL
}

#[derive(Clone)]
pub struct Recorder {
    enricher: Enricher,
    store: Arc<dyn EventStore>,
}

impl Recorder {
    pub fn new(enricher: Enricher, store: Arc<dyn EventStore>) -> Self {
        Self { enricher, store }
    }

    /// 记录一次页面访问
    pub async fn record_visit(&self, ctx: &ClientContext) -> RecordOutcome {
        let enrichment = self.enricher.enrich(ctx).await;
        let event = build_event(
            PAGE_VISIT_SLUG.to_string(),
            or_default(ctx.page_url.as_deref(), UNKNOWN),
            ctx,
            enrichment,
        );
        self.write(event).await
    }

    /// 记录一次外链点击
    pub async fn record_click(
        &self,
        ctx: &ClientContext,
        target_id: &str,
        target_url: &str,
    ) -> RecordOutcome {
        if is_placeholder(target_url) {
            trace!("Click on placeholder link '{}' ignored", target_id);
            return RecordOutcome::Skipped;
        }

        if target_id.trim() == PAGE_VISIT_SLUG {
            warn!(
                "Refusing to record click with reserved slug '{}' ({})",
                PAGE_VISIT_SLUG, target_url
            );
            return RecordOutcome::Skipped;
        }

        let enrichment = self.enricher.enrich(ctx).await;
        let event = build_event(
            or_default(Some(target_id), UNKNOWN),
            target_url.trim().to_string(),
            ctx,
            enrichment,
        );
        self.write(event).await
    }

    /// 在后台记录访问，立即返回
    pub fn dispatch_visit(&self, ctx: ClientContext) -> JoinHandle<RecordOutcome> {
        let recorder = self.clone();
        tokio::spawn(async move { recorder.record_visit(&ctx).await })
    }

    /// 在后台记录点击，立即返回
    pub fn dispatch_click(
        &self,
        ctx: ClientContext,
        target_id: String,
        target_url: String,
    ) -> JoinHandle<RecordOutcome> {
        let recorder = self.clone();
        tokio::spawn(async move { recorder.record_click(&ctx, &target_id, &target_url).await })
    }

    async fn write(&self, event: NewClickEvent) -> RecordOutcome {
        let slug = event.slug.clone();
        match self.store.insert(event).await {
            Ok(()) => {
                debug!("Recorded '{}' in {} store", slug, self.store.backend_name());
                RecordOutcome::Recorded
            }
            Err(e) => {
                warn!("Failed to record '{}': {}", slug, e);
                RecordOutcome::Failed
            }
        }
    }
}

fn build_event(
    slug: String,
    url: String,
    ctx: &ClientContext,
    enrichment: Enrichment,
) -> NewClickEvent {
    let Enrichment { client, network } = enrichment;
    NewClickEvent {
        slug,
        url,
        referrer: or_default(ctx.referrer.as_deref(), DIRECT_REFERRER),
        browser: client.browser,
        os: client.os,
        device: client.device,
        country: network.country,
        ip: Some(network.ip),
        isp: Some(network.isp),
    }
}
