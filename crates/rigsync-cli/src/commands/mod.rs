//! CLI command handlers
//!
//! Profile management and device operations each have their own module.

pub mod device;
pub mod profile;
