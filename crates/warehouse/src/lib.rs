//! Data source gateway: one bounded query per session, normalised into
//! funnel records.

pub mod clickhouse_source;
pub mod json_file;
pub mod source;

pub use clickhouse_source::ClickHouseSource;
pub use json_file::JsonFileSource;
pub use source::{from_config, normalize_rows, FunnelSource, MemorySource};
