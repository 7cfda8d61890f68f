//! Bar sources and account reporting

pub mod connector;
pub mod csv_source;
pub mod provider;
pub mod synthetic;

pub use connector::ConnectorBarSource;
pub use csv_source::CsvBarSource;
pub use provider::{daily_change, fetch_table, AccountSource, BarSource, DataError, MemorySource};
pub use synthetic::{synthetic_bars, SyntheticBarSource, SyntheticConfig};
