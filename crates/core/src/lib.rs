pub mod config;
pub mod error;
pub mod filters;
pub mod states;
pub mod types;

pub use config::AppConfig;
pub use error::{DashResult, DashboardError};
pub use filters::{DateBounds, FilterEdit, FilterSession, FilterState};
pub use types::{Dimension, FunnelRecord, MetricSelector, RawFunnelRow, RawMeasure, NOT_ENTERED};
