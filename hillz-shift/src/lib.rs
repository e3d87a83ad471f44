//! Hillz Shift event site library
//!
//! Event registrations, invitations and the admin area guarded by signed
//! session cookies. The binary entry point is in main.rs.

pub mod admin;
pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod identity;
pub mod server;
pub mod session;
mod sql;
pub mod store;
