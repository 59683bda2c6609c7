pub mod click_event;

pub use click_event::Entity as ClickEventEntity;
