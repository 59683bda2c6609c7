//! Click event entity (page visits and outbound link clicks)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "click_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub created_at: DateTimeUtc,
    /// Tracked link id, or `page_visit` for page impressions
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    #[sea_orm(column_type = "Text")]
    pub referrer: String,
    pub browser: String,
    pub os: String,
    /// desktop | mobile | tablet | bot
    pub device: String,
    pub country: String,
    pub ip: Option<String>,
    pub isp: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
