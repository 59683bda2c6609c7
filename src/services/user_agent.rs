//! User-Agent classification
//!
//! Browser / OS take the leftmost known token in the signature; device class
//! follows a fixed priority: bot > tablet > mobile > desktop.

use serde::Serialize;

use crate::analytics::{DeviceClass, UNKNOWN};

const BROWSER_TOKENS: &[&str] = &[
    "chrome", "safari", "firefox", "edge", "opera", "msie", "trident",
];
const OS_TOKENS: &[&str] = &["windows", "macintosh", "linux", "android", "iphone", "ipad"];

const BOT_TOKENS: &[&str] = &["bot", "crawl", "slurp", "spider"];
const TABLET_TOKENS: &[&str] = &["tablet", "ipad", "playbook", "silk"];
const MOBILE_TOKENS: &[&str] = &["mobile", "iphone", "ipod", "android"];

/// Browser / OS / device derived from a client signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientProfile {
    pub browser: String,
    pub os: String,
    pub device: DeviceClass,
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self {
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            device: DeviceClass::Desktop,
        }
    }
}

/// 分类 User-Agent，缺失或空串时返回默认值
pub fn classify(user_agent: Option<&str>) -> ClientProfile {
    let Some(ua) = user_agent.map(str::trim).filter(|s| !s.is_empty()) else {
        return ClientProfile::default();
    };

    // ASCII 小写不改变字节偏移，可以直接切回原串
    let lower = ua.to_ascii_lowercase();

    ClientProfile {
        browser: leftmost_token(ua, &lower, BROWSER_TOKENS)
            .unwrap_or(UNKNOWN)
            .to_string(),
        os: leftmost_token(ua, &lower, OS_TOKENS)
            .unwrap_or(UNKNOWN)
            .to_string(),
        device: classify_device(&lower),
    }
}

fn classify_device(lower: &str) -> DeviceClass {
    let has_any = |tokens: &[&str]| tokens.iter().any(|t| lower.contains(t));

    if has_any(BOT_TOKENS) {
        DeviceClass::Bot
    } else if has_any(TABLET_TOKENS) {
        DeviceClass::Tablet
    } else if has_any(MOBILE_TOKENS) {
        DeviceClass::Mobile
    } else {
        DeviceClass::Desktop
    }
}

/// 最左侧出现的 token（同一位置时列表中靠前者优先），按原串大小写返回
fn leftmost_token<'a>(ua: &'a str, lower: &str, tokens: &[&str]) -> Option<&'a str> {
    let mut best: Option<(usize, usize)> = None;
    for token in tokens {
        if let Some(pos) = lower.find(token)
            && best.is_none_or(|(best_pos, _)| pos < best_pos)
        {
            best = Some((pos, token.len()));
        }
    }
    best.and_then(|(pos, len)| ua.get(pos..pos + len))
}
