// globals.rs

//! # Global Configuration Module
//!
//! Holds the AWS region and profile chosen on the command line. Both are set
//! once in `main` through `OnceCell` and read by the AWS client constructor.
//!
//! ## Example Usage
//! ```rust
//! use crate::globals::{aws_profile, aws_region, init_globals};
//!
//! fn setup() {
//!     init_globals(Some("eu-west-1".to_string()), None);
//!     assert_eq!(aws_region(), Some("eu-west-1"));
//!     assert_eq!(aws_profile(), None);
//! }
//! ```

use once_cell::sync::OnceCell;

// ============================
// Global Static Variables
// ============================

/// Region override from `--region`. Unset means the SDK default chain decides.
static AWS_REGION: OnceCell<Option<String>> = OnceCell::new();

/// Named profile from `--profile`.
static AWS_PROFILE: OnceCell<Option<String>> = OnceCell::new();

// ============================
// Initialization Function
// ============================

/// Initializes the global AWS settings. First initialization wins.
pub fn init_globals(region: Option<String>, profile: Option<String>) {
    AWS_REGION.set(non_empty(region)).ok();
    AWS_PROFILE.set(non_empty(profile)).ok();
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================
// Getter Functions
// ============================

/// The configured region, if one was given.
pub fn aws_region() -> Option<&'static str> {
    AWS_REGION.get().and_then(|r| r.as_deref())
}

/// The configured profile, if one was given.
pub fn aws_profile() -> Option<&'static str> {
    AWS_PROFILE.get().and_then(|p| p.as_deref())
}
