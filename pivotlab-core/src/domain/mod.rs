//! Domain types for PivotLab

pub mod account;
pub mod bar;
pub mod label;
pub mod timeframe;

pub use account::{aggregate_positions, PositionLot, PositionSummary};
pub use bar::{Bar, BarError, BarTable};
pub use label::Label;
pub use timeframe::{Timeframe, UnknownTimeframe};
