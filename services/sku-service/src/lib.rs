//! Equipment SKU allocation service library.
//!
//! This crate primarily ships a `sku-service` binary, but we expose a library
//! surface so the content backend's write path and the integration tests can
//! call the allocator directly.

pub mod admin;
pub mod allocator;
pub mod api;
pub mod config;
pub mod db;
pub mod ids;
pub mod lifecycle;
pub mod state;
