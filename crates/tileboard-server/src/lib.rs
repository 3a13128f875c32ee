//! Tileboard HTTP server
//!
//! Serves table schemas, chart suggestions, saved dashboards and their render
//! plans over a small JSON API. All evaluation happens in `tileboard-engine`.

pub mod config;
pub mod logging;
pub mod provider;
pub mod routes;
pub mod store;

pub use config::{Config, ConfigError};
pub use provider::{JsonDirProvider, ProviderError, TableDataProvider};
pub use routes::{router, ApiError, AppState};
pub use store::{DocumentStore, NewVisualization, StoreError};
