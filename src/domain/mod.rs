//! Domain types and the ports the ledger talks to.

pub mod balance;
pub mod money;
pub mod ports;
pub mod transaction;
