//! services/api/src/lib.rs
//!
//! The host service for the household store: configuration, the snapshot and
//! remote adapters, and the HTTP/WebSocket surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
