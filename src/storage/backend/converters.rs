use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use tracing::debug;

use crate::analytics::{ClickEvent, DeviceClass, NewClickEvent};
use migration::entities::click_event;

/// 数据库行 → ClickEvent
pub fn model_to_event(model: click_event::Model) -> ClickEvent {
    let device = model.device.parse::<DeviceClass>().unwrap_or_else(|e| {
        debug!("Event {}: {}, treating as desktop", model.id, e);
        DeviceClass::Desktop
    });

    ClickEvent {
        id: model.id,
        created_at: model.created_at,
        slug: model.slug,
        url: model.url,
        referrer: model.referrer,
        browser: model.browser,
        os: model.os,
        device,
        country: model.country,
        ip: model.ip,
        isp: model.isp,
    }
}

/// NewClickEvent → ActiveModel（id 交给数据库自增）
pub fn event_to_active_model(
    event: NewClickEvent,
    created_at: DateTime<Utc>,
) -> click_event::ActiveModel {
    click_event::ActiveModel {
        id: NotSet,
        created_at: Set(created_at),
        slug: Set(event.slug),
        url: Set(event.url),
        referrer: Set(event.referrer),
        browser: Set(event.browser),
        os: Set(event.os),
        device: Set(event.device.to_string()),
        country: Set(event.country),
        ip: Set(event.ip),
        isp: Set(event.isp),
    }
}
