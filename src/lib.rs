//! Cashier client core: realtime notifications and withdrawal orchestration.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod realtime;
pub mod resilience;
pub mod withdraw;

pub use config::schema::CashierConfig;
pub use lifecycle::Shutdown;
pub use realtime::RealtimeHub;
pub use withdraw::WithdrawOrchestrator;
