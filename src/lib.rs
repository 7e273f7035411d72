//! Library crate for marble-league-sync, exposing modules for binaries and tests.

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
