//! Domain types for the holdings engine

pub mod history;
pub mod ids;
pub mod period;
pub mod position;
pub mod security;
pub mod snapshot;
pub mod trend;

pub use history::{History, HistoryError};
pub use ids::{EntityId, SecurityId};
pub use period::{PeriodKey, PeriodKeyError};
pub use position::{Position, RawLineItem};
pub use security::{Security, UNKNOWN_SECTOR};
pub use snapshot::{Snapshot, SnapshotError};
pub use trend::{Trend, TrendDirection};
