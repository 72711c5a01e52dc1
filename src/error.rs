use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for the reddit-persona library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The profile URL does not contain a `/user/<name>` segment.
    #[error("Invalid Reddit user profile URL: '{url}'")]
    InvalidProfileUrl {
        /// The rejected input
        url: String,
    },

    /// Configuration validation error or missing credential.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// A custom prompt template failed validation.
    #[error("Invalid template '{path}': {message}")]
    TemplateValidation {
        /// Path of the rejected template
        path: String,
        /// Reason for rejection
        message: String,
    },

    /// Transport-level failure talking to an external service.
    #[error("{service} request failed: {message}")]
    Http {
        /// Service name (`reddit`, `openai`)
        service: &'static str,
        /// Error message
        message: String,
    },

    /// The external service answered with a non-success status or an
    /// unusable body.
    #[error("{service} API error{}: {message}", status_suffix(.status))]
    Api {
        /// Service name (`reddit`, `openai`)
        service: &'static str,
        /// HTTP status, when the failure came with one
        status: Option<u16>,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an invalid profile URL error.
    #[must_use]
    pub fn invalid_profile_url(url: impl Into<String>) -> Self {
        Self::InvalidProfileUrl { url: url.into() }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        Self::Template {
            template: template.into(),
            message: render_chain(&source),
        }
    }

    /// Creates a template validation error.
    #[must_use]
    pub fn template_validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateValidation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a transport error for the named service.
    #[must_use]
    pub fn http(service: &'static str, source: &reqwest::Error) -> Self {
        Self::Http {
            service,
            message: source.to_string(),
        }
    }

    /// Creates an API error for the named service.
    #[must_use]
    pub fn api(service: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            status,
            message: message.into(),
        }
    }

    /// Returns true if the error was caused by malformed user input.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidProfileUrl { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if an external service (Reddit or the text-generation
    /// API) caused the failure.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Api { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

// Tera hides the interesting part of the message in the source chain.
fn render_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }
    message
}
