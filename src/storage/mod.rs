//! 事件存储
//!
//! 核心只依赖 `EventStore` 的两个操作：追加写入与全量倒序读取。
//! 内置两种实现：
//! - `MemoryEventStore`：进程内，适用于测试与 `memory://`
//! - `SeaOrmEventStore`：SQLite / MySQL / PostgreSQL

use std::sync::Arc;

use async_trait::async_trait;

use crate::analytics::{ClickEvent, NewClickEvent};
use crate::errors::Result;

pub mod backend;
pub mod memory;

pub use backend::SeaOrmEventStore;
pub use memory::MemoryEventStore;

/// 事件存储接口
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 追加一条事件，id 与 created_at 由存储分配
    async fn insert(&self, event: NewClickEvent) -> Result<()>;

    /// 读取全部事件，按 created_at 倒序（相同时间按 id 倒序）
    async fn query_all(&self) -> Result<Vec<ClickEvent>>;

    /// 事件总数（健康检查用，不加载全表）
    async fn count(&self) -> Result<u64>;

    /// 后端名称（用于日志）
    fn backend_name(&self) -> &str;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 根据 database_url 创建事件存储
    pub async fn create() -> Result<Arc<dyn EventStore>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;

        if database_url.starts_with("memory://") {
            return Ok(Arc::new(MemoryEventStore::new()));
        }

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;
        let store = SeaOrmEventStore::new(database_url, &backend_type).await?;
        Ok(Arc::new(store))
    }
}
