//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to RPC / indexer / aggregator:
//!     → per-call timeout (tokio::time::timeout at the client)
//!     → On failure: retries.rs (bounded attempts, linear backoff from backoff.rs)
//!     → Exhausted: caller maps RetryError into the engine taxonomy
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retry budgets are small and fixed (3 attempts by default)
//! - Only reads and re-submissions of identical signed bytes are retried

pub mod backoff;
pub mod retries;

pub use retries::{retry_async, retry_async_when, RetryError, RetryPolicy};
