// ABOUTME: Application name validation.
// ABOUTME: App names become systemd unit prefixes and remote directory names.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("app name must start with a letter")]
    InvalidStart,

    #[error("app name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("app name must be lowercase")]
    NotLowercase,

    #[error("invalid character in app name: '{0}'")]
    InvalidChar(char),
}

/// A validated application name, safe to embed in unit filenames and paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        let Some(first) = value.chars().next() else {
            return Err(AppNameError::Empty);
        };

        if value.len() > 63 {
            return Err(AppNameError::TooLong);
        }

        if !first.is_ascii_lowercase() {
            if first.is_ascii_uppercase() {
                return Err(AppNameError::NotLowercase);
            }
            return Err(AppNameError::InvalidStart);
        }

        if value.ends_with('-') {
            return Err(AppNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(AppNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
                return Err(AppNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
