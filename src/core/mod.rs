// core/mod.rs

//! # Core Module
//!
//! The stack model, the status poller and the operation driver, plus the
//! request and variables loading that feed them.

pub mod changeset;
pub mod driver;
pub mod env;
pub mod poller;
pub mod request;
pub mod status;
pub mod variables;
