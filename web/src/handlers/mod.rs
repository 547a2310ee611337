//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by resource.

pub mod health;
pub mod legacy;
pub mod logs;
pub mod requests;

pub use health::health_check;
