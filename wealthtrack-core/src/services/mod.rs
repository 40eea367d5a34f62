//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod aggregation;
mod expense_store;
pub mod intake;
pub mod logging;
mod session;

pub use aggregation::{
    AggregationViews, CategoryShare, DashboardSummary, LiveViews, MonthlyTotal,
};
pub use expense_store::{ExpenseStore, StoreSnapshot};
pub use intake::{AcceptedCategories, ExpenseDraft, FormIntake};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use session::{SessionService, SessionState};
