use std::fmt;

/// Engine error types.
///
/// Absent or malformed payload data is not an error: extraction recovers it
/// locally and linking reports it as a no-match. Only the conditions below
/// propagate to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The candidate pool or theme store cannot be read.
    UpstreamUnavailable(String),
    /// The payload cannot produce an order record at all (no order id).
    InvalidPayload(String),
    /// The engine configuration is inconsistent with its reference data.
    Configuration(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure comes from an unreadable collaborator.
    pub fn is_upstream(&self) -> bool {
        matches!(self.root(), AppError::UpstreamUnavailable(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::UpstreamUnavailable(msg) => write!(f, "Upstream unavailable: {}", msg),
            AppError::InvalidPayload(msg) => write!(f, "Invalid payload: {}", msg),
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_display() {
        let err: Result<(), AppError> =
            Err(AppError::UpstreamUnavailable("pool offline".to_string()));
        let err = err.context("linking order 42").unwrap_err();

        assert_eq!(
            err.to_string(),
            "linking order 42: Upstream unavailable: pool offline"
        );
        assert!(err.is_upstream());
    }

    #[test]
    fn test_root_skips_nested_context() {
        let err: Result<(), AppError> = Err(AppError::InvalidPayload("no id".to_string()));
        let err = err
            .with_context(|| "normalizing".to_string())
            .context("ingesting page")
            .unwrap_err();

        assert_eq!(err.root(), &AppError::InvalidPayload("no id".to_string()));
        assert!(!err.is_upstream());
    }
}
