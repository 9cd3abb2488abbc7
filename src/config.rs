//! Per-binding configuration.
//!
//! Every field is optional; unset fields fall back to their defaults when
//! read, so a `Config` records only what the caller actually changed.

use crate::custom::CustomFlagRegistry;
use crate::logger::Logger;
use std::sync::Arc;

/// What the flag engine does when argument parsing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Print the error and exit the process.
    #[default]
    Exit,
    /// Print the error and the usage text, then return the error.
    Continue,
    /// Return the error without printing anything.
    Silent,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    error_handling: Option<ErrorHandling>,
    command_name: Option<String>,
    custom_flags: Option<Arc<CustomFlagRegistry>>,
    logger: Option<Logger>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = Some(error_handling);
        self
    }

    /// Register the binding under `name` instead of the declared function name.
    pub fn with_command_name(mut self, name: impl Into<String>) -> Self {
        self.command_name = Some(name.into());
        self
    }

    pub fn with_custom_flags(mut self, registry: CustomFlagRegistry) -> Self {
        self.custom_flags = Some(Arc::new(registry));
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling.unwrap_or_default()
    }

    pub fn command_name(&self) -> Option<&str> {
        self.command_name.as_deref()
    }

    pub fn custom_flags(&self) -> Arc<CustomFlagRegistry> {
        self.custom_flags.clone().unwrap_or_default()
    }

    pub fn logger(&self) -> Logger {
        self.logger.unwrap_or_default()
    }
}
