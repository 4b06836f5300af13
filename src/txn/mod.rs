//! Transaction layer: locked batches and the per-transaction context

pub mod context;
pub mod locked_batch;

pub use context::TransactionContext;
pub use locked_batch::{LockTarget, LockedBatch};
