//! Core domain types and logic.

pub mod account;
pub mod user;
pub mod trade;
pub mod transfer;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
pub mod equity;
pub mod error;
