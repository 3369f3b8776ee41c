//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Unexpected channel close:
//!     → backoff.rs (is another attempt allowed? how long to wait?)
//!     → realtime::connection schedules the reconnect timer
//! ```
//!
//! # Design Decisions
//! - Reconnection is bounded; after the budget the channel stays down
//!   until the caller reconnects explicitly
//! - Delay grows linearly with the attempt number, no jitter

pub mod backoff;

pub use backoff::LinearBackoff;
