// ABOUTME: Validated newtype wrappers shared across the crate.
// ABOUTME: Exports AppName and its validation error.

mod app_name;

pub use app_name::{AppName, AppNameError};
