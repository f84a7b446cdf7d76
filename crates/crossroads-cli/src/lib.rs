//! Crossroads: offline maintenance tool for stored adventures.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
