//! Discovery and refresh runs against the external catalog, gated by a
//! shared daily token budget.

pub mod budget;
mod discovery;
pub mod orchestrator;
mod refresh;
pub mod source;

pub use budget::{Clock, Reservation, SystemClock, TokenBudget, TokenStatus};
pub use orchestrator::{
    SyncError, SyncMode, SyncOrchestrator, SyncOutcome, SyncRequest, SyncSettings, SyncSummary,
};
pub use source::{CatalogSource, CostModel};
