//! 点击事件表迁移
//!
//! 创建 click_events 表，页面访问与外链点击共用一张只追加的表：
//! - slug：链接标识，`page_visit` 表示页面访问
//! - 客户端分类 (browser, os, device)
//! - 网络信息 (country, ip, isp)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClickEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClickEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickEvents::Slug).string_len(255).not_null())
                    .col(ColumnDef::new(ClickEvents::Url).text().not_null())
                    .col(ColumnDef::new(ClickEvents::Referrer).text().not_null())
                    .col(ColumnDef::new(ClickEvents::Browser).string_len(64).not_null())
                    .col(ColumnDef::new(ClickEvents::Os).string_len(64).not_null())
                    .col(ColumnDef::new(ClickEvents::Device).string_len(16).not_null())
                    .col(ColumnDef::new(ClickEvents::Country).string_len(100).not_null())
                    .col(ColumnDef::new(ClickEvents::Ip).string_len(45).null())
                    .col(ColumnDef::new(ClickEvents::Isp).string_len(255).null())
                    .to_owned(),
            )
            .await?;

        // created_at 索引（全量倒序扫描）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_events_created_at")
                    .table(ClickEvents::Table)
                    .col(ClickEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // slug 索引（链接排行）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_events_slug")
                    .table(ClickEvents::Table)
                    .col(ClickEvents::Slug)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_click_events_slug").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_click_events_created_at").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ClickEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClickEvents {
    #[sea_orm(iden = "click_events")]
    Table,
    Id,
    CreatedAt,
    Slug,
    Url,
    Referrer,
    Browser,
    Os,
    Device,
    Country,
    Ip,
    Isp,
}
