//! Core domain types and logic.

pub mod account;
pub mod config;
pub mod deal;
pub mod error;
pub mod ids;
pub mod order;
pub mod position;
pub mod report;
pub mod simulation;
pub mod strategy;
pub mod tick;
pub mod trade;
