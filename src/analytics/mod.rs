//! 访问与点击分析
//!
//! - `recorder`：组装事件并写入存储（尽力而为，不阻塞调用方）
//! - `aggregator`：从全量事件计算看板汇总
//! - `scheduler`：看板的定时刷新与倒计时

pub mod aggregator;
pub mod recorder;
pub mod scheduler;

pub use aggregator::{
    Aggregator, AnalyticsSummary, DEFAULT_RECENT_LIMIT, Dimension, GroupCount, SummarySource,
    TodayWindow, by_browser, by_country, by_device, by_referrer, group_by, summarize, top_links,
};
pub use recorder::{RecordOutcome, Recorder, is_placeholder};
pub use scheduler::{DashboardSnapshot, RefreshOutcome, RefreshScheduler};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 页面访问事件的保留 slug
pub const PAGE_VISIT_SLUG: &str = "page_visit";
/// 无法识别时的默认值
pub const UNKNOWN: &str = "Unknown";
/// 没有来源页时的 referrer
pub const DIRECT_REFERRER: &str = "direct";
/// 不可跳转的占位链接
pub const PLACEHOLDER_URL: &str = "#";

/// 设备类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    Tablet,
    Bot,
}

/// 已持久化的事件（id 与 created_at 由存储分配）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub slug: String,
    pub url: String,
    pub referrer: String,
    pub browser: String,
    pub os: String,
    pub device: DeviceClass,
    pub country: String,
    pub ip: Option<String>,
    pub isp: Option<String>,
}

impl ClickEvent {
    /// 是否为页面访问（否则为外链点击）
    #[inline]
    pub fn is_page_visit(&self) -> bool {
        self.slug == PAGE_VISIT_SLUG
    }
}

/// 待写入的事件
///
/// 不含 id / created_at，只有 `EventStore::insert` 能把它变成 `ClickEvent`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClickEvent {
    pub slug: String,
    pub url: String,
    pub referrer: String,
    pub browser: String,
    pub os: String,
    pub device: DeviceClass,
    pub country: String,
    pub ip: Option<String>,
    pub isp: Option<String>,
}

impl NewClickEvent {
    #[inline]
    pub fn is_page_visit(&self) -> bool {
        self.slug == PAGE_VISIT_SLUG
    }

    /// 由存储在写入时调用
    pub fn into_event(self, id: i64, created_at: DateTime<Utc>) -> ClickEvent {
        ClickEvent {
            id,
            created_at,
            slug: self.slug,
            url: self.url,
            referrer: self.referrer,
            browser: self.browser,
            os: self.os,
            device: self.device,
            country: self.country,
            ip: self.ip,
            isp: self.isp,
        }
    }
}

/// Replace a missing or blank value with `default`
pub(crate) fn or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_serializes_lowercase() {
        let json = serde_json::to_string(&DeviceClass::Tablet).unwrap();
        assert_eq!(json, "\"tablet\"");
        assert_eq!("BOT".parse::<DeviceClass>(), Ok(DeviceClass::Bot));
        assert!("phone".parse::<DeviceClass>().is_err());
        assert_eq!(DeviceClass::Mobile.to_string(), "mobile");
    }

    #[test]
    fn test_or_default() {
        assert_eq!(or_default(None, DIRECT_REFERRER), "direct");
        assert_eq!(or_default(Some("   "), DIRECT_REFERRER), "direct");
        assert_eq!(
            or_default(Some("https://t.co/x"), DIRECT_REFERRER),
            "https://t.co/x"
        );
    }
}
