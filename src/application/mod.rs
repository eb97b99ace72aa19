//! Application layer containing the ledger orchestration.
//!
//! This module defines the `LedgerEngine`, the single entry point for reading
//! and moving balances, and the unit-of-work runner it uses to keep every
//! balance change and its ledger entries in one atomic scope.

pub mod engine;
pub mod operation;
pub mod unit_of_work;
