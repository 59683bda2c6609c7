//! SeaORM storage backend
//!
//! Persists click events in SQLite, MySQL/MariaDB or PostgreSQL.

mod connection;
mod converters;
pub mod retry;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};
use tracing::{debug, info};

use crate::analytics::{ClickEvent, NewClickEvent};
use crate::errors::{LinkpulseError, Result};
use crate::storage::EventStore;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{event_to_active_model, model_to_event};
pub use retry::RetryPolicy;

use migration::entities::click_event;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(LinkpulseError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://, memory://",
            database_url
        )))
    }
}

/// SeaORM-based event store
#[derive(Clone)]
pub struct SeaOrmEventStore {
    db: DatabaseConnection,
    backend_name: String,
    retry: RetryPolicy,
}

impl SeaOrmEventStore {
    /// 连接数据库并执行迁移
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        run_migrations(&db).await?;

        info!(
            "Event store ready: {} backend",
            backend_name.to_uppercase()
        );

        Ok(Self::from_connection(db, backend_name))
    }

    /// 使用已有连接（迁移需由调用方保证）
    pub fn from_connection(db: DatabaseConnection, backend_name: &str) -> Self {
        let config = crate::config::get_config();
        Self {
            db,
            backend_name: backend_name.to_string(),
            retry: RetryPolicy::from_config(&config.database),
        }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl EventStore for SeaOrmEventStore {
    async fn insert(&self, event: NewClickEvent) -> Result<()> {
        let slug = event.slug.clone();
        let model = event_to_active_model(event, Utc::now());
        let db = &self.db;

        self.retry
            .run("insert_click_event", || {
                let model = model.clone();
                async move { click_event::Entity::insert(model).exec(db).await }
            })
            .await
            .map_err(|e| {
                LinkpulseError::store_unavailable(format!(
                    "Failed to insert event '{}': {}",
                    slug, e
                ))
            })?;

        debug!("Event '{}' written to {} store", slug, self.backend_name);
        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<ClickEvent>> {
        let db = &self.db;
        let models = self
            .retry
            .run("query_click_events", || async move {
                click_event::Entity::find()
                    .order_by_desc(click_event::Column::CreatedAt)
                    .order_by_desc(click_event::Column::Id)
                    .all(db)
                    .await
            })
            .await
            .map_err(|e| {
                LinkpulseError::store_unavailable(format!("Failed to read events: {}", e))
            })?;

        Ok(models.into_iter().map(model_to_event).collect())
    }

    async fn count(&self) -> Result<u64> {
        click_event::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| LinkpulseError::store_unavailable(format!("Failed to count events: {}", e)))
    }

    fn backend_name(&self) -> &str {
        &self.backend_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("linkpulse.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("sqlite://data/events.sqlite?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/lp").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/lp").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}
