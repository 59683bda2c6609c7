pub mod dashboard;
pub mod health;
pub mod response;
pub mod tracking;

pub use dashboard::{DashboardService, dashboard_routes};
pub use health::{HealthService, health_routes};
pub use response::{ApiResponse, ErrorCode};
pub use tracking::{TrackingService, tracking_routes};
