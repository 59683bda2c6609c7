//! Enrichment and session services
//!
//! Shared by the HTTP API, the CLI and the terminal dashboard.

pub mod enricher;
pub mod geoip;
pub mod session;
pub mod user_agent;

pub use enricher::{ClientContext, Enricher, Enrichment};
pub use geoip::{GeoInfo, GeoIpLookup, GeoIpProvider, NetworkIdentity};
pub use session::{Session, SessionProvider, StaticTokenSessions};
pub use user_agent::{ClientProfile, classify};
