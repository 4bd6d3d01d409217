//! Submission security: CSRF tokens and input sanitizing

pub mod csrf;
pub mod sanitize;

pub use csrf::CsrfProtect;
pub use sanitize::sanitize_input;
