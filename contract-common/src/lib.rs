//! # Contract Common Library
//!
//! Shared code for the contract time-slice services including:
//! - Error and result types
//! - Configuration loading and resolution
//! - Bearer token validation
//! - Database initialization and schema
//! - Timestamp utilities

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
