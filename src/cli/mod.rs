//! Command implementations behind the `rialsync` binary

pub mod catalog;
pub mod export;
pub mod schedule;
pub mod setup;
pub mod ui;
pub mod update;
