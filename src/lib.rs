//! CASTMARKET — Prediction markets on Farcaster social-activity metrics
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod accounting;
pub mod api;
pub mod cache;
pub mod config;
pub mod fees;
pub mod ledger;
pub mod market;
pub mod profiles;
pub mod providers;
pub mod settlement;
pub mod types;
pub mod withdrawal;
