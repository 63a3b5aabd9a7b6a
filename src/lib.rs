//! Bookshelf application library
//!
//! Wires the framework crates together and hosts the project modules.

pub mod app;
pub mod modules;
