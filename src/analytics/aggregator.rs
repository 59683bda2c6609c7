//! 看板汇总
//!
//! 读取全量事件（按 created_at 倒序），单次遍历得到各项计数与分组。
//! 纯计算部分 `summarize` 不依赖存储，可以直接测试。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};
use tracing::debug;

use super::{ClickEvent, UNKNOWN};
use crate::errors::Result;
use crate::storage::EventStore;

/// 实时动态默认展示条数
pub const DEFAULT_RECENT_LIMIT: usize = 25;

/// 分组后的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub key: String,
    pub count: usize,
}

/// 看板汇总（每次重新计算，不持久化）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub today_total_visits: usize,
    pub today_total_clicks: usize,
    pub overall_total_visits: usize,
    pub overall_total_clicks: usize,
    /// 不含 page_visit
    pub top_links: Vec<GroupCount>,
    pub by_country: Vec<GroupCount>,
    pub by_device: Vec<GroupCount>,
    pub by_referrer: Vec<GroupCount>,
    pub by_browser: Vec<GroupCount>,
    /// 最新的 N 条事件，倒序
    pub recent: Vec<ClickEvent>,
}

impl AnalyticsSummary {
    pub fn total_events(&self) -> usize {
        self.overall_total_visits + self.overall_total_clicks
    }

    /// 出现过的国家数
    pub fn country_count(&self) -> usize {
        self.by_country.len()
    }

    /// 出现过的来源数
    pub fn referrer_count(&self) -> usize {
        self.by_referrer.len()
    }
}

/// 今天的时间窗 `[本地零点, 次日本地零点)`，以 UTC 表示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TodayWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// 包含 `now` 的本地自然日
    pub fn containing<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let offset = now.offset().fix();
        let date = now.date_naive();

        let start = local_midnight(&tz, date, offset);
        let end = date
            .succ_opt()
            .map(|next| local_midnight(&tz, next, offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self { start, end }
    }

    pub fn today() -> Self {
        Self::containing(&Local::now())
    }

    #[inline]
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        *at >= self.start && *at < self.end
    }
}

/// 零点不存在（夏令时跳变）时按当前偏移换算
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate, fallback: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => DateTime::from_naive_utc_and_offset(
            naive - TimeDelta::seconds(fallback.local_minus_utc().into()),
            Utc,
        ),
    }
}

/// 分组维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Dimension {
    Slug,
    Country,
    Device,
    Referrer,
    Browser,
}

impl Dimension {
    pub fn key<'a>(&self, event: &'a ClickEvent) -> &'a str {
        match self {
            Dimension::Slug => &event.slug,
            Dimension::Country => &event.country,
            Dimension::Device => event.device.as_ref(),
            Dimension::Referrer => &event.referrer,
            Dimension::Browser => &event.browser,
        }
    }
}

/// 计数并保留首次出现顺序，输出时按计数稳定降序
#[derive(Default)]
struct RankedCounter {
    index: HashMap<String, usize>,
    entries: Vec<GroupCount>,
}

impl RankedCounter {
    fn add(&mut self, key: &str) {
        let key = if key.trim().is_empty() { UNKNOWN } else { key };
        match self.index.get(key) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push(GroupCount {
                    key: key.to_string(),
                    count: 1,
                });
            }
        }
    }

    fn into_ranked(self) -> Vec<GroupCount> {
        let mut entries = self.entries;
        // sort_by 是稳定排序，计数相同保持首次出现顺序
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }
}

/// 按单个维度分组
pub fn group_by<'a, I>(events: I, dimension: Dimension) -> Vec<GroupCount>
where
    I: IntoIterator<Item = &'a ClickEvent>,
{
    let mut counter = RankedCounter::default();
    for event in events {
        counter.add(dimension.key(event));
    }
    counter.into_ranked()
}

pub fn top_links(events: &[ClickEvent]) -> Vec<GroupCount> {
    group_by(events.iter().filter(|e| !e.is_page_visit()), Dimension::Slug)
}

pub fn by_country(events: &[ClickEvent]) -> Vec<GroupCount> {
    group_by(events, Dimension::Country)
}

pub fn by_device(events: &[ClickEvent]) -> Vec<GroupCount> {
    group_by(events, Dimension::Device)
}

pub fn by_referrer(events: &[ClickEvent]) -> Vec<GroupCount> {
    group_by(events, Dimension::Referrer)
}

pub fn by_browser(events: &[ClickEvent]) -> Vec<GroupCount> {
    group_by(events, Dimension::Browser)
}

/// 计算汇总
///
/// `events` 须为 created_at 倒序（存储的 `query_all` 保证）。
pub fn summarize(events: &[ClickEvent], today: &TodayWindow, recent_limit: usize) -> AnalyticsSummary {
    let mut summary = AnalyticsSummary::default();

    let mut links = RankedCounter::default();
    let mut countries = RankedCounter::default();
    let mut devices = RankedCounter::default();
    let mut referrers = RankedCounter::default();
    let mut browsers = RankedCounter::default();

    for event in events {
        let is_today = today.contains(&event.created_at);
        if event.is_page_visit() {
            summary.overall_total_visits += 1;
            if is_today {
                summary.today_total_visits += 1;
            }
        } else {
            summary.overall_total_clicks += 1;
            if is_today {
                summary.today_total_clicks += 1;
            }
            links.add(Dimension::Slug.key(event));
        }

        countries.add(Dimension::Country.key(event));
        devices.add(Dimension::Device.key(event));
        referrers.add(Dimension::Referrer.key(event));
        browsers.add(Dimension::Browser.key(event));
    }

    summary.top_links = links.into_ranked();
    summary.by_country = countries.into_ranked();
    summary.by_device = devices.into_ranked();
    summary.by_referrer = referrers.into_ranked();
    summary.by_browser = browsers.into_ranked();
    summary.recent = events.iter().take(recent_limit).cloned().collect();

    summary
}

/// 汇总来源（Aggregator 与刷新调度器之间的接缝）
#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn compute_summary(&self) -> Result<AnalyticsSummary>;
}

/// 基于事件存储的汇总器
pub struct Aggregator {
    store: Arc<dyn EventStore>,
    recent_limit: usize,
}

impl Aggregator {
    pub fn new(store: Arc<dyn EventStore>, recent_limit: usize) -> Self {
        Self {
            store,
            recent_limit,
        }
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    /// 以给定时刻为"现在"计算
    pub async fn compute_summary_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<AnalyticsSummary> {
        let events = self.store.query_all().await?;
        debug!(
            "Aggregating {} events from {} store",
            events.len(),
            self.store.backend_name()
        );
        Ok(summarize(
            &events,
            &TodayWindow::containing(now),
            self.recent_limit,
        ))
    }
}

#[async_trait]
impl SummarySource for Aggregator {
    async fn compute_summary(&self) -> Result<AnalyticsSummary> {
        self.compute_summary_at(&Local::now()).await
    }
}
