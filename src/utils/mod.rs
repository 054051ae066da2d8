//! Shared helper functions.

pub mod validation;
